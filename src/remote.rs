use std::borrow::Cow;

use tracing::{debug, info, warn};

use crate::app::{AppError, ScoreBook};
use crate::domain::update::{self, UpdateError};
use crate::domain::{AppState, ExamPayload};
use crate::normalize::{normalize_state, SEED_SUBJECT_NAME};
use crate::payload::{build_payload, ExamForm};
use crate::store::{RowBackend, StoreError};

/// Dashboard backed by user-scoped rows. Every mutation goes to the backend
/// first and is followed by a full reload of the user's subjects, so the
/// snapshot only ever reflects what the backend acknowledged.
pub struct RemoteDashboard<B> {
    backend: B,
    user_id: String,
    state: AppState,
    revision: u64,
    last_error: Option<String>,
}

impl<B: RowBackend> RemoteDashboard<B> {
    /// Loads the user's subjects, creating a starter subject when the user has
    /// none yet.
    pub fn open(mut backend: B, user_id: impl Into<String>) -> Result<Self, AppError> {
        let user_id = user_id.into();
        let state = load_state(&mut backend, &user_id, None)?;
        Ok(Self {
            backend,
            user_id,
            state,
            revision: 0,
            last_error: None,
        })
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Re-reads every subject from the backend, keeping the active subject
    /// when it still exists.
    pub fn reload(&mut self) -> Result<(), AppError> {
        let active = self.state.active_subject_id.clone();
        self.refresh(Some(active))
    }

    fn refresh(&mut self, prefer_active: Option<String>) -> Result<(), AppError> {
        let loaded = load_state(&mut self.backend, &self.user_id, prefer_active.as_deref());
        let next = self.record(loaded)?;
        self.state = next;
        self.revision += 1;
        debug!(revision = self.revision, user = %self.user_id, "reloaded subjects");
        Ok(())
    }

    /// Runs one backend mutation, remembering a failure for display.
    fn mutate<T, F>(&mut self, op: F) -> Result<T, AppError>
    where
        F: FnOnce(&mut B, &str) -> Result<T, StoreError>,
    {
        let result = op(&mut self.backend, &self.user_id).map_err(AppError::from);
        self.record(result)
    }

    fn record<T>(&mut self, result: Result<T, AppError>) -> Result<T, AppError> {
        match result {
            Ok(value) => {
                self.last_error = None;
                Ok(value)
            }
            Err(err) => {
                warn!(user = %self.user_id, error = %err, "backend request failed");
                self.last_error = Some(err.to_string());
                Err(err)
            }
        }
    }

    fn active_subject_id(&self) -> Result<String, AppError> {
        self.state
            .active_subject()
            .map(|subject| subject.id.clone())
            .ok_or_else(|| AppError::InvalidArgument("no active subject".to_string()))
    }
}

/// Rows always derive `total` from the section scores.
fn derived_payload(form: &ExamForm) -> Result<ExamPayload, AppError> {
    let form = ExamForm {
        total: None,
        ..form.clone()
    };
    build_payload(&form).ok_or(AppError::IncompleteExam)
}

fn load_state<B: RowBackend>(
    backend: &mut B,
    user_id: &str,
    prefer_active: Option<&str>,
) -> Result<AppState, AppError> {
    let mut subjects = backend.list_subjects(user_id)?;
    if subjects.is_empty() {
        info!(user = %user_id, "no subjects yet; creating starter subject");
        backend.insert_subject(SEED_SUBJECT_NAME, user_id)?;
        subjects = backend.list_subjects(user_id)?;
    }

    let active_subject_id = prefer_active
        .filter(|id| subjects.iter().any(|subject| subject.id == *id))
        .map(str::to_string)
        .or_else(|| subjects.first().map(|subject| subject.id.clone()))
        .unwrap_or_default();
    let state = AppState {
        subjects,
        active_subject_id,
    };

    Ok(match normalize_state(&state) {
        Cow::Borrowed(_) => state,
        Cow::Owned(repaired) => {
            warn!(user = %user_id, "backend rows needed repair");
            repaired
        }
    })
}

impl<B: RowBackend> ScoreBook for RemoteDashboard<B> {
    fn state(&self) -> &AppState {
        &self.state
    }

    fn add_subject(&mut self, name: &str) -> Result<String, AppError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(UpdateError::BlankSubjectName.into());
        }
        let id = self.mutate(|backend, user| backend.insert_subject(name, user))?;
        self.refresh(Some(id.clone()))?;
        Ok(id)
    }

    fn delete_subject(&mut self, subject_id: &str) -> Result<(), AppError> {
        update::remove_subject(&self.state, subject_id)?;
        self.mutate(|backend, user| backend.delete_subject(subject_id, user))?;
        self.reload()
    }

    fn select_subject(&mut self, subject_id: &str) -> Result<(), AppError> {
        self.state = update::select_subject(&self.state, subject_id)?;
        self.revision += 1;
        Ok(())
    }

    fn add_exam(&mut self, form: &ExamForm) -> Result<(), AppError> {
        let payload = derived_payload(form)?;
        let subject_id = self.active_subject_id()?;
        self.mutate(|backend, user| backend.insert_exam(&subject_id, user, &payload))?;
        self.reload()
    }

    fn update_exam(&mut self, exam_id: &str, form: &ExamForm) -> Result<(), AppError> {
        let payload = derived_payload(form)?;
        self.mutate(|backend, user| backend.update_exam(exam_id, user, &payload))?;
        self.reload()
    }

    fn delete_exam(&mut self, exam_id: &str) -> Result<(), AppError> {
        self.mutate(|backend, user| backend.delete_exam(exam_id, user))?;
        self.reload()
    }
}

#[cfg(test)]
mod tests;
