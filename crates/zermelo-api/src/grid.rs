//! Turns raw appointments into a display-ready grid.
//!
//! Processing order matters: duplicates are dropped in the order the API
//! returned them, the survivors are sorted by start time, and only then is
//! every entry annotated.

use std::collections::HashSet;

use chrono::{DateTime, NaiveTime, TimeZone};
use chrono_tz::Tz;
use serde_json::Value;

use crate::types::{Appointment, GridEntry};

/// Nominal start of the first lesson, local time
pub const SCHOOL_DAY_START: (u32, u32) = (8, 30);

/// Number of periods the slot correction walks through
const SLOT_CORRECTION_STEPS: u32 = 8;

const DISPLAY_FORMAT: &str = "%d/%m/%Y %-H:%M";

#[derive(Debug, Clone, Copy)]
pub struct GridProcessor {
    tz: Tz,
}

impl Default for GridProcessor {
    fn default() -> Self {
        Self::new(chrono_tz::Europe::Amsterdam)
    }
}

impl GridProcessor {
    /// Processor rendering times in `tz`.
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// Deduplicate by start time, sort, and annotate.
    pub fn process(&self, appointments: Vec<Appointment>) -> Vec<GridEntry> {
        let mut seen = HashSet::new();
        let mut unique: Vec<Appointment> = appointments
            .into_iter()
            .filter(|a| seen.insert(a.start))
            .collect();

        unique.sort_by_key(|a| a.start);

        unique
            .into_iter()
            .map(|appointment| self.annotate(appointment))
            .collect()
    }

    fn annotate(&self, appointment: Appointment) -> GridEntry {
        GridEntry {
            start_date: self.format_timestamp(appointment.start),
            end_date: self.format_timestamp(appointment.end),
            hour: self.hour_slot(appointment.start),
            appointment,
        }
    }

    /// Render `timestamp` as `dd/mm/yyyy H:mm`.
    pub fn format_timestamp(&self, timestamp: i64) -> String {
        self.local(timestamp).format(DISPLAY_FORMAT).to_string()
    }

    /// Lesson period for an appointment starting at `start`.
    ///
    /// Whole hours since 08:30 that day, rounded, with a floor of 1. An
    /// appointment landing in period 1 only stays there if it starts on one
    /// of the half-hour marks 8:30..15:30, checked in order; every mismatch
    /// bumps the period by one, which ends the walk.
    pub fn hour_slot(&self, start: i64) -> u32 {
        let local = self.local(start);
        let since_day_start = start.saturating_sub(self.school_day_start(&local));

        let rounded = (since_day_start as f64 / 3600.0).round() as i64;
        let mut hour = u32::try_from(rounded.max(1)).unwrap_or(u32::MAX);

        let clock = local.format("%-H:%M").to_string();
        for i in 0..SLOT_CORRECTION_STEPS {
            if hour != 1 {
                break;
            }
            if clock == format!("{}:{:02}", SCHOOL_DAY_START.0 + i, SCHOOL_DAY_START.1) {
                break;
            }
            hour += 1;
        }

        hour
    }

    fn local(&self, timestamp: i64) -> DateTime<Tz> {
        let utc = DateTime::from_timestamp(timestamp, 0).unwrap_or_else(|| {
            tracing::warn!("Timestamp {} is out of range, using the epoch", timestamp);
            DateTime::default()
        });
        utc.with_timezone(&self.tz)
    }

    fn school_day_start(&self, local: &DateTime<Tz>) -> i64 {
        let (h, m) = SCHOOL_DAY_START;
        let time = NaiveTime::from_hms_opt(h, m, 0).unwrap_or(NaiveTime::MIN);
        let naive = local.date_naive().and_time(time);
        self.tz
            .from_local_datetime(&naive)
            .earliest()
            .map(|dt| dt.timestamp())
            .unwrap_or_else(|| naive.and_utc().timestamp())
    }
}

/// Entries whose `field` equals `value`, or contains it when the field is a list.
///
/// Comparison is loose the way the API data needs it: `true`/`false` match
/// `1`/`0`, and numeric strings match numbers.
pub fn grid_portion(grid: &[GridEntry], field: &str, value: impl Into<Value>) -> Vec<GridEntry> {
    let needle = value.into();
    grid.iter()
        .filter(|entry| match entry.field(field) {
            Some(Value::Array(items)) => items.iter().any(|item| loosely_equal(item, &needle)),
            Some(found) => loosely_equal(&found, &needle),
            None => false,
        })
        .cloned()
        .collect()
}

/// Classes for `subject`, or the whole grid when no subject is given.
pub fn classes(grid: &[GridEntry], subject: Option<&str>) -> Vec<GridEntry> {
    match subject {
        Some(subject) => grid_portion(grid, "subjects", subject),
        None => grid.to_vec(),
    }
}

pub fn teacher_classes(grid: &[GridEntry], teacher: &str) -> Vec<GridEntry> {
    grid_portion(grid, "teachers", teacher)
}

pub fn cancelled_classes(grid: &[GridEntry]) -> Vec<GridEntry> {
    grid_portion(grid, "cancelled", 1)
}

fn loosely_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Bool(flag), other) | (other, Value::Bool(flag)) => {
            as_flag(other).is_some_and(|v| v == *flag)
        }
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        (Value::Number(n), Value::String(s)) | (Value::String(s), Value::Number(n)) => {
            s.trim().parse::<f64>().ok() == n.as_f64()
        }
        _ => a == b,
    }
}

fn as_flag(value: &Value) -> Option<bool> {
    match value {
        Value::Number(n) => n.as_f64().map(|v| v != 0.0),
        Value::String(s) => match s.trim() {
            "1" | "true" => Some(true),
            "0" | "false" | "" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::Europe::Amsterdam;

    /// Local midnight of Monday 2024-01-15 in Amsterdam (UTC+1)
    fn t0() -> i64 {
        Amsterdam
            .with_ymd_and_hms(2024, 1, 15, 0, 0, 0)
            .unwrap()
            .timestamp()
    }

    fn appointment(start: i64, end: i64) -> Appointment {
        Appointment::new(start, end)
    }

    fn processor() -> GridProcessor {
        GridProcessor::new(Amsterdam)
    }

    #[test]
    fn test_first_period() {
        let t0 = t0();
        let grid = processor().process(vec![appointment(t0 + 8 * 3600 + 1800, t0 + 9 * 3600 + 1200)]);

        assert_eq!(grid.len(), 1);
        assert_eq!(grid[0].hour, 1);
        assert_eq!(grid[0].start_date, "15/01/2024 8:30");
        assert_eq!(grid[0].end_date, "15/01/2024 9:20");
    }

    #[test]
    fn test_later_periods() {
        let t0 = t0();
        let p = processor();
        // 10:30 is two hours after 08:30
        assert_eq!(p.hour_slot(t0 + 10 * 3600 + 1800), 2);
        // 13:00 is 4.5 hours after, rounds away from zero
        assert_eq!(p.hour_slot(t0 + 13 * 3600), 5);
        // 09:30 rounds to period 1 and is bumped off it
        assert_eq!(p.hour_slot(t0 + 9 * 3600 + 1800), 2);
    }

    #[test]
    fn test_period_one_off_the_half_hour_is_bumped() {
        let t0 = t0();
        let p = processor();
        // 09:00 rounds to period 1 but does not start on 8:30
        assert_eq!(p.hour_slot(t0 + 9 * 3600), 2);
        // 08:45 rounds to 0, is floored to 1, then bumped
        assert_eq!(p.hour_slot(t0 + 8 * 3600 + 2700), 2);
    }

    #[test]
    fn test_early_appointments_floor_at_one() {
        let t0 = t0();
        let p = processor();
        // 07:00 is 1.5 hours before the day starts
        let hour = p.hour_slot(t0 + 7 * 3600);
        assert!(hour >= 1);
        assert_eq!(hour, 2);
        assert!(p.hour_slot(t0) >= 1);
    }

    #[test]
    fn test_dedup_keeps_first() {
        let t0 = t0();
        let mut first = appointment(t0 + 10 * 3600 + 1800, t0 + 11 * 3600 + 1200);
        first.subjects = vec!["wi".to_string()];
        let mut second = appointment(t0 + 10 * 3600 + 1800, t0 + 11 * 3600 + 1200);
        second.subjects = vec!["ne".to_string()];

        let grid = processor().process(vec![first, second]);

        assert_eq!(grid.len(), 1);
        assert_eq!(grid[0].appointment.subjects, vec!["wi"]);
    }

    #[test]
    fn test_sorted_strictly_increasing() {
        let t0 = t0();
        let starts: [i64; 7] = [14, 9, 11, 9, 8, 14, 12];
        let input = starts
            .iter()
            .map(|h| appointment(t0 + h * 3600 + 1800, t0 + h * 3600 + 4800))
            .collect();

        let grid = processor().process(input);

        assert_eq!(grid.len(), 5);
        assert!(grid
            .windows(2)
            .all(|w| w[0].appointment.start < w[1].appointment.start));
        assert!(grid.iter().all(|e| e.hour >= 1));
    }

    #[test]
    fn test_empty_input() {
        assert!(processor().process(Vec::new()).is_empty());
    }

    #[test]
    fn test_idempotent() {
        let t0 = t0();
        let input = vec![
            appointment(t0 + 12 * 3600, t0 + 13 * 3600),
            appointment(t0 + 8 * 3600 + 1800, t0 + 9 * 3600),
            appointment(t0 + 12 * 3600, t0 + 12 * 3600 + 600),
        ];

        let p = processor();
        let once = p.process(input);
        let twice = p.process(once.iter().cloned().map(GridEntry::into_appointment).collect());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_summer_time_uses_local_day_start() {
        // 2024-06-10 08:30 in Amsterdam is 06:30 UTC
        let start = Amsterdam
            .with_ymd_and_hms(2024, 6, 10, 8, 30, 0)
            .unwrap()
            .timestamp();
        let p = processor();
        assert_eq!(p.hour_slot(start), 1);
        assert_eq!(p.format_timestamp(start), "10/06/2024 8:30");
    }

    #[test]
    fn test_out_of_range_timestamp_falls_back_to_epoch() {
        let p = processor();
        assert_eq!(p.format_timestamp(i64::MAX), "01/01/1970 1:00");
        assert_eq!(p.format_timestamp(i64::MIN), "01/01/1970 1:00");
        assert!(p.hour_slot(i64::MAX) >= 1);
        assert!(p.hour_slot(i64::MIN) >= 1);
    }

    fn sample_grid() -> Vec<GridEntry> {
        let t0 = t0();
        let mut math = appointment(t0 + 8 * 3600 + 1800, t0 + 9 * 3600 + 1200);
        math.subjects = vec!["wi".to_string()];
        math.teachers = vec!["abc".to_string(), "def".to_string()];
        math.cancelled = true;

        let mut dutch = appointment(t0 + 10 * 3600 + 1800, t0 + 11 * 3600 + 1200);
        dutch.subjects = vec!["ne".to_string()];
        dutch.teachers = vec!["def".to_string()];
        dutch
            .extra
            .insert("locations".to_string(), serde_json::json!(["101"]));

        processor().process(vec![math, dutch])
    }

    #[test]
    fn test_grid_portion_cancelled() {
        let grid = sample_grid();
        let cancelled = grid_portion(&grid, "cancelled", 1);
        assert_eq!(cancelled.len(), 1);
        assert_eq!(cancelled[0].appointment.subjects, vec!["wi"]);

        assert_eq!(cancelled_classes(&grid), cancelled);
        assert_eq!(grid_portion(&grid, "cancelled", 0).len(), 1);
        assert_eq!(grid_portion(&grid, "cancelled", true).len(), 1);
    }

    #[test]
    fn test_grid_portion_list_fields() {
        let grid = sample_grid();
        assert_eq!(teacher_classes(&grid, "def").len(), 2);
        assert_eq!(teacher_classes(&grid, "abc").len(), 1);
        assert!(teacher_classes(&grid, "xyz").is_empty());

        assert_eq!(classes(&grid, Some("ne")).len(), 1);
        assert_eq!(classes(&grid, None).len(), 2);
    }

    #[test]
    fn test_grid_portion_scalar_and_passthrough_fields() {
        let grid = sample_grid();
        assert_eq!(grid_portion(&grid, "hour", 1).len(), 1);
        assert_eq!(grid_portion(&grid, "hour", "2").len(), 1);
        assert_eq!(grid_portion(&grid, "locations", "101").len(), 1);
        assert!(grid_portion(&grid, "nonexistent", "101").is_empty());
    }
}
