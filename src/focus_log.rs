use chrono::TimeZone;
use time::OffsetDateTime;
use tracing::{debug, warn};

use crate::analytics::{aggregate, aggregate_in, retention_cutoff, FocusAnalytics};
use crate::app::AppError;
use crate::domain::FocusEntry;
use crate::store::RowBackend;
use crate::timer::FocusCompletion;

/// Append-only focus history for one user, cached for the retention window.
pub struct FocusLog<B> {
    backend: B,
    user_id: String,
    retention_days: i64,
    entries: Vec<FocusEntry>,
    last_error: Option<String>,
}

impl<B: RowBackend> FocusLog<B> {
    pub fn new(backend: B, user_id: impl Into<String>, retention_days: i64) -> Self {
        Self {
            backend,
            user_id: user_id.into(),
            retention_days,
            entries: Vec::new(),
            last_error: None,
        }
    }

    pub fn entries(&self) -> &[FocusEntry] {
        &self.entries
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Replaces the cache with every entry inside the retention window.
    pub fn load(&mut self, now: OffsetDateTime) -> Result<&[FocusEntry], AppError> {
        let since = retention_cutoff(now, self.retention_days);
        match self.backend.list_focus_entries(&self.user_id, since) {
            Ok(entries) => {
                debug!(user = %self.user_id, count = entries.len(), "loaded focus entries");
                self.entries = entries;
                self.last_error = None;
                Ok(&self.entries)
            }
            Err(err) => Err(self.fail(err.into())),
        }
    }

    /// Appends a focus interval ending at `at`, then reloads the window ending
    /// at `now`. Non-positive durations are ignored and report `false`.
    pub fn record(
        &mut self,
        duration_secs: i64,
        at: OffsetDateTime,
        now: OffsetDateTime,
    ) -> Result<bool, AppError> {
        if duration_secs <= 0 {
            return Ok(false);
        }
        if let Err(err) = self
            .backend
            .insert_focus_entry(&self.user_id, duration_secs, at)
        {
            return Err(self.fail(err.into()));
        }
        self.load(now)?;
        Ok(true)
    }

    /// Records a timer interval that ended at `now`.
    pub fn record_completion(
        &mut self,
        completion: &FocusCompletion,
        now: OffsetDateTime,
    ) -> Result<bool, AppError> {
        self.record(i64::from(completion.duration_secs), now, now)
    }

    pub fn analytics(&self, now: OffsetDateTime) -> FocusAnalytics {
        aggregate(&self.entries, now)
    }

    pub fn analytics_in<Tz: TimeZone>(&self, now: OffsetDateTime, zone: &Tz) -> FocusAnalytics {
        aggregate_in(&self.entries, now, zone)
    }

    fn fail(&mut self, err: AppError) -> AppError {
        warn!(user = %self.user_id, error = %err, "focus log request failed");
        self.last_error = Some(err.to_string());
        err
    }
}
