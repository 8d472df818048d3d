use std::borrow::Cow;
use std::error::Error;
use std::fmt;

use tracing::{debug, info, warn};

use crate::config::ConfigError;
use crate::domain::update::{self, UpdateError};
use crate::domain::{AppState, ExamEntry};
use crate::ids;
use crate::normalize::{normalize_state, normalize_value};
use crate::payload::{build_payload, ExamForm};
use crate::store::{KeyValueStore, StoreError};

/// Mutations shared by the blob-backed and row-backed dashboards. Every call
/// either replaces the whole snapshot or leaves it untouched.
pub trait ScoreBook {
    fn state(&self) -> &AppState;

    fn add_subject(&mut self, name: &str) -> Result<String, AppError>;

    fn delete_subject(&mut self, subject_id: &str) -> Result<(), AppError>;

    fn select_subject(&mut self, subject_id: &str) -> Result<(), AppError>;

    /// Adds an exam to the active subject.
    fn add_exam(&mut self, form: &ExamForm) -> Result<(), AppError>;

    fn update_exam(&mut self, exam_id: &str, form: &ExamForm) -> Result<(), AppError>;

    fn delete_exam(&mut self, exam_id: &str) -> Result<(), AppError>;
}

/// Dashboard persisted as one JSON blob under a fixed key.
pub struct LocalDashboard<S> {
    store: S,
    key: String,
    state: AppState,
    revision: u64,
    last_error: Option<String>,
}

impl<S: KeyValueStore> LocalDashboard<S> {
    /// Loads and normalizes the stored blob, writing it back only when
    /// normalization had to change something.
    pub fn open(mut store: S, key: impl Into<String>) -> Result<Self, AppError> {
        let key = key.into();
        let raw = store.get(&key)?;
        let normalized = normalize_value(raw.as_ref());
        if normalized.needs_write() {
            info!(key = %key, origin = ?normalized.origin, "rewriting normalized state");
            store.set(&key, &serde_json::to_value(&normalized.state)?)?;
        }
        Ok(Self {
            store,
            key,
            state: normalized.state,
            revision: 0,
            last_error: None,
        })
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Message for the most recent failed write, cleared by the next success.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    fn active_subject_id(&self) -> Result<String, AppError> {
        self.state
            .active_subject()
            .map(|subject| subject.id.clone())
            .ok_or_else(|| AppError::InvalidArgument("no active subject".to_string()))
    }

    fn commit(&mut self, next: AppState) -> Result<(), AppError> {
        let next = match normalize_state(&next) {
            Cow::Borrowed(_) => next,
            Cow::Owned(repaired) => repaired,
        };
        let encoded = serde_json::to_value(&next)?;
        if let Err(err) = self.store.set(&self.key, &encoded) {
            warn!(key = %self.key, error = %err, "state write failed; keeping previous snapshot");
            self.last_error = Some(err.to_string());
            return Err(err.into());
        }
        self.last_error = None;
        self.state = next;
        self.revision += 1;
        debug!(revision = self.revision, "committed state");
        Ok(())
    }
}

impl<S: KeyValueStore> ScoreBook for LocalDashboard<S> {
    fn state(&self) -> &AppState {
        &self.state
    }

    fn add_subject(&mut self, name: &str) -> Result<String, AppError> {
        let id = ids::unique_id(|candidate| self.state.subject(candidate).is_some());
        let next = update::add_subject(&self.state, id.clone(), name)?;
        self.commit(next)?;
        Ok(id)
    }

    fn delete_subject(&mut self, subject_id: &str) -> Result<(), AppError> {
        let next = update::remove_subject(&self.state, subject_id)?;
        self.commit(next)
    }

    fn select_subject(&mut self, subject_id: &str) -> Result<(), AppError> {
        let next = update::select_subject(&self.state, subject_id)?;
        self.commit(next)
    }

    fn add_exam(&mut self, form: &ExamForm) -> Result<(), AppError> {
        let payload = build_payload(form).ok_or(AppError::IncompleteExam)?;
        let subject_id = self.active_subject_id()?;
        let taken = self.state.active_exams();
        let id = ids::unique_id(|candidate| taken.iter().any(|exam| exam.id == candidate));
        let entry = ExamEntry::from_payload(id, payload);
        let next = update::add_exam(&self.state, &subject_id, entry)?;
        self.commit(next)
    }

    fn update_exam(&mut self, exam_id: &str, form: &ExamForm) -> Result<(), AppError> {
        let payload = build_payload(form).ok_or(AppError::IncompleteExam)?;
        let subject_id = self.active_subject_id()?;
        let next = update::replace_exam(&self.state, &subject_id, exam_id, payload)?;
        self.commit(next)
    }

    fn delete_exam(&mut self, exam_id: &str) -> Result<(), AppError> {
        let subject_id = self.active_subject_id()?;
        let next = update::remove_exam(&self.state, &subject_id, exam_id)?;
        self.commit(next)
    }
}

#[derive(Debug)]
pub enum AppError {
    Io(std::io::Error),
    Store(StoreError),
    Json(serde_json::Error),
    Config(ConfigError),
    Update(UpdateError),
    IncompleteExam,
    InvalidArgument(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Io(err) => write!(f, "I/O error: {}", err),
            AppError::Store(err) => write!(f, "storage error: {}", err),
            AppError::Json(err) => write!(f, "JSON error: {}", err),
            AppError::Config(err) => write!(f, "{}", err),
            AppError::Update(err) => write!(f, "{}", err),
            AppError::IncompleteExam => write!(f, "exam needs a paper name"),
            AppError::InvalidArgument(message) => write!(f, "{}", message),
        }
    }
}

impl Error for AppError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            AppError::Io(err) => Some(err),
            AppError::Store(err) => Some(err),
            AppError::Json(err) => Some(err),
            AppError::Config(err) => Some(err),
            AppError::Update(err) => Some(err),
            AppError::IncompleteExam => None,
            AppError::InvalidArgument(_) => None,
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        AppError::Io(value)
    }
}

impl From<StoreError> for AppError {
    fn from(value: StoreError) -> Self {
        AppError::Store(value)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(value: serde_json::Error) -> Self {
        AppError::Json(value)
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        AppError::Config(value)
    }
}

impl From<UpdateError> for AppError {
    fn from(value: UpdateError) -> Self {
        AppError::Update(value)
    }
}

#[cfg(test)]
mod tests;
