//! School-week date windows.
//!
//! All windows run from local midnight to local midnight in the display time
//! zone and are expressed in epoch seconds, as the API expects.

use chrono::{DateTime, Datelike, Days, NaiveDate, NaiveTime, TimeZone, Weekday};
use chrono_tz::Tz;

/// Monday to Saturday
const SCHOOL_WEEK_DAYS: u64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub start: i64,
    pub end: i64,
}

impl DateWindow {
    /// This week: Monday on or before today up to the following Saturday.
    pub fn current_week(now: DateTime<Tz>) -> Self {
        let tz = now.timezone();
        let today = now.date_naive();
        let back = u64::from(today.weekday().num_days_from_monday());
        let monday = today.checked_sub_days(Days::new(back)).unwrap_or(today);
        Self::school_week(tz, monday)
    }

    /// Window for the appointment grid `weeks` ahead.
    ///
    /// One week (or zero) means "from today up to the coming Saturday".
    /// More weeks select the school week starting on the first Monday on or
    /// after the same day `weeks` weeks from now.
    pub fn grid_ahead(now: DateTime<Tz>, weeks: u32) -> Self {
        let tz = now.timezone();
        let today = now.date_naive();
        if weeks <= 1 {
            let saturday = next_weekday(today, Weekday::Sat);
            Self::between(tz, today, saturday)
        } else {
            Self::weeks_ahead(tz, today, weeks)
        }
    }

    /// Window for announcements `weeks` ahead.
    ///
    /// One week (or zero) means the next school week, starting the first
    /// Monday after today.
    pub fn announcements_ahead(now: DateTime<Tz>, weeks: u32) -> Self {
        let tz = now.timezone();
        let today = now.date_naive();
        if weeks <= 1 {
            Self::school_week(tz, next_weekday(today, Weekday::Mon))
        } else {
            Self::weeks_ahead(tz, today, weeks)
        }
    }

    /// Fill in missing bounds: no bounds is the current week, a start
    /// without an end covers the school week from that start.
    pub fn resolve(start: Option<i64>, end: Option<i64>, now: DateTime<Tz>) -> Self {
        match (start, end) {
            (Some(start), Some(end)) => Self { start, end },
            (Some(start), None) => Self {
                start,
                end: start + SCHOOL_WEEK_DAYS as i64 * 86_400,
            },
            (None, end) => {
                let week = Self::current_week(now);
                Self {
                    start: week.start,
                    end: end.unwrap_or(week.end),
                }
            }
        }
    }

    fn weeks_ahead(tz: Tz, today: NaiveDate, weeks: u32) -> Self {
        let target = today
            .checked_add_days(Days::new(u64::from(weeks) * 7))
            .unwrap_or(today);
        Self::school_week(tz, on_or_after(target, Weekday::Mon))
    }

    fn school_week(tz: Tz, monday: NaiveDate) -> Self {
        let saturday = monday
            .checked_add_days(Days::new(SCHOOL_WEEK_DAYS))
            .unwrap_or(monday);
        Self::between(tz, monday, saturday)
    }

    fn between(tz: Tz, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start: local_midnight(tz, start),
            end: local_midnight(tz, end),
        }
    }
}

/// Epoch seconds of local midnight on `date`.
pub fn local_midnight(tz: Tz, date: NaiveDate) -> i64 {
    let naive = date.and_time(NaiveTime::MIN);
    tz.from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.timestamp())
        .unwrap_or_else(|| naive.and_utc().timestamp())
}

fn days_until(from: Weekday, to: Weekday) -> u64 {
    u64::from((to.num_days_from_monday() + 7 - from.num_days_from_monday()) % 7)
}

/// First `weekday` strictly after `date`.
fn next_weekday(date: NaiveDate, weekday: Weekday) -> NaiveDate {
    let days = match days_until(date.weekday(), weekday) {
        0 => 7,
        n => n,
    };
    date.checked_add_days(Days::new(days)).unwrap_or(date)
}

/// `date` itself if it is a `weekday`, otherwise the next one.
fn on_or_after(date: NaiveDate, weekday: Weekday) -> NaiveDate {
    date.checked_add_days(Days::new(days_until(date.weekday(), weekday)))
        .unwrap_or(date)
}
