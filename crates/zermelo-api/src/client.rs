//! Zermelo API client.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tracing::instrument;
use zermelo_auth::TokenStore;
use zermelo_core::ApiConfig;

use crate::dates::DateWindow;
use crate::envelope;
use crate::error::ZermeloError;
use crate::grid::{self, GridProcessor};
use crate::transport::ApiTransport;
use crate::types::{Announcement, Appointment, GridEntry, TokenResponse};

const APPOINTMENTS_PATH: &str = "api/v2/appointments";
const ANNOUNCEMENTS_PATH: &str = "api/v2/announcements";
const TOKEN_PATH: &str = "api/v2/oauth/token";
const LOGOUT_PATH: &str = "api/v2/oauth/logout";

/// Marker the portal puts in its HTML error page when a code exchange fails
const AUTH_ERROR_MARKER: &str = "Error report";

/// Fetches schedules and announcements for students of one school.
///
/// Requests are issued one at a time; nothing is retried.
pub struct ScheduleClient {
    transport: ApiTransport,
    store: Arc<dyn TokenStore>,
    processor: GridProcessor,
}

impl ScheduleClient {
    /// Client for `school` with the default timeout and display time zone.
    ///
    /// A blank `school` is rejected the same way a config without one is.
    pub fn new(school: &str, secure: bool, store: Arc<dyn TokenStore>) -> Result<Self, ZermeloError> {
        let config = ApiConfig {
            school: school.to_string(),
            secure,
            ..ApiConfig::default()
        };
        Self::from_config(&config, store)
    }

    pub fn from_config(config: &ApiConfig, store: Arc<dyn TokenStore>) -> Result<Self, ZermeloError> {
        let transport = ApiTransport::new(
            config.school()?,
            config.secure,
            Duration::from_secs(config.timeout_secs),
        )?;
        let processor = GridProcessor::new(config.tz()?);
        Ok(Self::with_transport(transport, store, processor))
    }

    pub fn with_transport(
        transport: ApiTransport,
        store: Arc<dyn TokenStore>,
        processor: GridProcessor,
    ) -> Self {
        Self {
            transport,
            store,
            processor,
        }
    }

    pub fn processor(&self) -> &GridProcessor {
        &self.processor
    }

    fn now(&self) -> DateTime<Tz> {
        Utc::now().with_timezone(&self.processor.timezone())
    }

    fn token(&self, id: &str) -> Result<String, ZermeloError> {
        Ok(self.store.get(id)?)
    }

    /// Appointment grid for student `id` between `start` and `end` (epoch seconds).
    ///
    /// Missing bounds default to the current school week.
    #[instrument(skip(self), level = "info")]
    pub async fn student_grid(
        &self,
        id: &str,
        start: Option<i64>,
        end: Option<i64>,
    ) -> Result<Vec<GridEntry>, ZermeloError> {
        let window = DateWindow::resolve(start, end, self.now());
        self.fetch_grid(id, window).await
    }

    /// Appointment grid `weeks` ahead; `1` is the rest of this week.
    #[instrument(skip(self), level = "info")]
    pub async fn student_grid_ahead(
        &self,
        id: &str,
        weeks: u32,
    ) -> Result<Vec<GridEntry>, ZermeloError> {
        let window = DateWindow::grid_ahead(self.now(), weeks);
        self.fetch_grid(id, window).await
    }

    async fn fetch_grid(&self, id: &str, window: DateWindow) -> Result<Vec<GridEntry>, ZermeloError> {
        let token = self.token(id)?;
        let start = window.start.to_string();
        let end = window.end.to_string();

        let raw = self
            .transport
            .get(
                APPOINTMENTS_PATH,
                &[
                    ("access_token", token.as_str()),
                    ("start", start.as_str()),
                    ("end", end.as_str()),
                    ("user", "~me"),
                ],
            )
            .await?;

        let appointments: Vec<Appointment> = envelope::decode(&raw)?;
        let grid = self.processor.process(appointments);

        tracing::info!("Fetched grid of {} appointments", grid.len());
        Ok(grid)
    }

    /// Announcements for student `id` between `start` and `end`.
    #[instrument(skip(self), level = "info")]
    pub async fn announcements(
        &self,
        id: &str,
        start: Option<i64>,
        end: Option<i64>,
    ) -> Result<Vec<Announcement>, ZermeloError> {
        let window = DateWindow::resolve(start, end, self.now());
        self.fetch_announcements(id, window).await
    }

    /// Announcements `weeks` ahead; `1` is next school week.
    #[instrument(skip(self), level = "info")]
    pub async fn announcements_ahead(
        &self,
        id: &str,
        weeks: u32,
    ) -> Result<Vec<Announcement>, ZermeloError> {
        let window = DateWindow::announcements_ahead(self.now(), weeks);
        self.fetch_announcements(id, window).await
    }

    async fn fetch_announcements(
        &self,
        id: &str,
        window: DateWindow,
    ) -> Result<Vec<Announcement>, ZermeloError> {
        let token = self.token(id)?;
        let start = window.start.to_string();
        let end = window.end.to_string();

        let raw = self
            .transport
            .get(
                ANNOUNCEMENTS_PATH,
                &[
                    ("access_token", token.as_str()),
                    ("start", start.as_str()),
                    ("end", end.as_str()),
                ],
            )
            .await?;

        let announcements: Vec<Announcement> = envelope::decode(&raw)?;
        tracing::info!("Fetched {} announcements", announcements.len());
        Ok(announcements)
    }

    /// Classes in `grid` for `subject`, or all of them.
    pub fn classes(&self, grid: &[GridEntry], subject: Option<&str>) -> Vec<GridEntry> {
        grid::classes(grid, subject)
    }

    pub fn teacher_classes(&self, grid: &[GridEntry], teacher: &str) -> Vec<GridEntry> {
        grid::teacher_classes(grid, teacher)
    }

    pub fn cancelled_classes(&self, grid: &[GridEntry]) -> Vec<GridEntry> {
        grid::cancelled_classes(grid)
    }

    /// Exchange an authorization code for an access token.
    ///
    /// Spaces in `code` are ignored (the portal displays it in groups of
    /// three). With `persist` the token is cached for `user`.
    #[instrument(skip(self, code), level = "info")]
    pub async fn grab_access_token(
        &self,
        user: &str,
        code: &str,
        persist: bool,
    ) -> Result<TokenResponse, ZermeloError> {
        let code: String = code.chars().filter(|c| !c.is_whitespace()).collect();
        if code.is_empty() {
            return Err(ZermeloError::AuthCodeInvalid);
        }

        let raw = self
            .transport
            .post(
                TOKEN_PATH,
                &[("grant_type", "authorization_code"), ("code", code.as_str())],
            )
            .await?;

        if raw.contains(AUTH_ERROR_MARKER) {
            tracing::warn!("Authorization code for {} was rejected", user);
            return Err(ZermeloError::AuthCodeInvalid);
        }

        let value: serde_json::Value = serde_json::from_str(&raw)
            .map_err(|e| ZermeloError::InvalidResponse(format!("JSON parse error: {}", e)))?;
        if value.get("error").is_some() {
            tracing::warn!("Authorization code for {} was rejected", user);
            return Err(ZermeloError::AuthCodeInvalid);
        }
        let token: TokenResponse =
            serde_json::from_value(value).map_err(|_| ZermeloError::AuthCodeInvalid)?;

        if persist {
            self.store.save(user, &token.access_token)?;
        }

        tracing::info!("Obtained access token for {}", user);
        Ok(token)
    }

    /// Log the cached token for `id` out of the portal.
    ///
    /// Returns true when the portal accepted the logout (empty body), in
    /// which case the token is also dropped from the cache.
    #[instrument(skip(self), level = "info")]
    pub async fn invalidate_access_token(&self, id: &str) -> Result<bool, ZermeloError> {
        let token = self.token(id)?;

        let raw = self
            .transport
            .post(LOGOUT_PATH, &[("access_token", token.as_str())])
            .await?;

        if !raw.is_empty() {
            tracing::warn!("Logout for {} was not accepted", id);
            return Ok(false);
        }

        self.store.remove(id)?;
        tracing::info!("Invalidated access token for {}", id);
        Ok(true)
    }

    /// Clear the token cache. Does nothing unless `confirm` is true.
    pub fn reset_cache(&self, confirm: bool) -> Result<(), ZermeloError> {
        Ok(self.store.reset(confirm)?)
    }
}
