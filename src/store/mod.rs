//! Persistence adapters: a key-value blob store for the local variant and a
//! user-scoped row backend for the remote variant.

use std::error::Error;
use std::fmt;

use serde_json::Value;
use time::OffsetDateTime;

use crate::domain::{ExamPayload, FocusEntry, Subject};

pub mod kv;
pub mod rows;

pub use kv::{MemoryKvStore, SqliteKvStore};
pub use rows::SqliteBackend;

pub trait KeyValueStore {
    /// The value stored under `key`. Text that is not JSON comes back as a
    /// JSON string so normalization can still decide what to do with it.
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;

    fn set(&mut self, key: &str, value: &Value) -> Result<(), StoreError>;
}

/// Row-oriented access, every call scoped to one user.
pub trait RowBackend {
    /// Subjects in creation order, each carrying its exams newest first.
    fn list_subjects(&self, user_id: &str) -> Result<Vec<Subject>, StoreError>;

    fn insert_exam(
        &mut self,
        subject_id: &str,
        user_id: &str,
        payload: &ExamPayload,
    ) -> Result<(), StoreError>;

    fn update_exam(
        &mut self,
        exam_id: &str,
        user_id: &str,
        payload: &ExamPayload,
    ) -> Result<(), StoreError>;

    fn delete_exam(&mut self, exam_id: &str, user_id: &str) -> Result<(), StoreError>;

    fn insert_subject(&mut self, name: &str, user_id: &str) -> Result<String, StoreError>;

    fn delete_subject(&mut self, subject_id: &str, user_id: &str) -> Result<(), StoreError>;

    /// Entries at or after `since`, oldest first.
    fn list_focus_entries(
        &self,
        user_id: &str,
        since: OffsetDateTime,
    ) -> Result<Vec<FocusEntry>, StoreError>;

    fn insert_focus_entry(
        &mut self,
        user_id: &str,
        duration: i64,
        timestamp: OffsetDateTime,
    ) -> Result<(), StoreError>;
}

#[derive(Debug)]
pub enum StoreError {
    Db(rusqlite::Error),
    Json(serde_json::Error),
    NotFound { kind: &'static str, id: String },
    /// A backend that lives elsewhere could not be reached. The SQLite
    /// backends never return it; implementations over a network service or
    /// another process report connection loss with it, and the dashboards
    /// surface it through `last_error` like any other failure.
    Unavailable(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Db(err) => write!(f, "database error: {}", err),
            StoreError::Json(err) => write!(f, "JSON encoding error: {}", err),
            StoreError::NotFound { kind, id } => write!(f, "{} '{}' not found", kind, id),
            StoreError::Unavailable(message) => write!(f, "backend unavailable: {}", message),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            StoreError::Db(err) => Some(err),
            StoreError::Json(err) => Some(err),
            StoreError::NotFound { .. } => None,
            StoreError::Unavailable(_) => None,
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        StoreError::Db(value)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        StoreError::Json(value)
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use super::StoreError;

    #[test]
    fn unreachable_backend_reports_its_reason_without_a_source() {
        let err = StoreError::Unavailable("connection refused".to_string());
        assert_eq!(err.to_string(), "backend unavailable: connection refused");
        assert!(err.source().is_none());
    }
}
