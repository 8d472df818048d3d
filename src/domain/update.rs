//! Pure state transitions. Each function returns a fresh `AppState` and leaves
//! its input untouched, so derived views always see a single snapshot.

use std::error::Error;
use std::fmt;

use super::exam::{AppState, ExamEntry, ExamPayload, Subject};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateError {
    BlankSubjectName,
    SubjectNotFound(String),
    ExamNotFound(String),
    LastSubject,
}

impl fmt::Display for UpdateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpdateError::BlankSubjectName => write!(f, "subject name cannot be empty"),
            UpdateError::SubjectNotFound(id) => write!(f, "subject '{}' not found", id),
            UpdateError::ExamNotFound(id) => write!(f, "exam '{}' not found", id),
            UpdateError::LastSubject => write!(f, "at least one subject must remain"),
        }
    }
}

impl Error for UpdateError {}

/// Appends a subject and makes it active.
pub fn add_subject(state: &AppState, id: String, name: &str) -> Result<AppState, UpdateError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(UpdateError::BlankSubjectName);
    }
    let mut subjects = state.subjects.clone();
    subjects.push(Subject {
        id: id.clone(),
        name: name.to_string(),
        exams: Vec::new(),
    });
    Ok(AppState {
        subjects,
        active_subject_id: id,
    })
}

pub fn remove_subject(state: &AppState, subject_id: &str) -> Result<AppState, UpdateError> {
    require_subject(state, subject_id)?;
    if state.subjects.len() <= 1 {
        return Err(UpdateError::LastSubject);
    }
    let subjects: Vec<Subject> = state
        .subjects
        .iter()
        .filter(|subject| subject.id != subject_id)
        .cloned()
        .collect();
    let active_subject_id = if state.active_subject_id == subject_id
        || !subjects.iter().any(|s| s.id == state.active_subject_id)
    {
        subjects[0].id.clone()
    } else {
        state.active_subject_id.clone()
    };
    Ok(AppState {
        subjects,
        active_subject_id,
    })
}

pub fn select_subject(state: &AppState, subject_id: &str) -> Result<AppState, UpdateError> {
    require_subject(state, subject_id)?;
    Ok(AppState {
        subjects: state.subjects.clone(),
        active_subject_id: subject_id.to_string(),
    })
}

/// Inserts an exam at the front of the subject's list; lists are newest first.
pub fn add_exam(
    state: &AppState,
    subject_id: &str,
    exam: ExamEntry,
) -> Result<AppState, UpdateError> {
    map_subject(state, subject_id, |subject| {
        let mut exams = Vec::with_capacity(subject.exams.len() + 1);
        exams.push(exam);
        exams.extend(subject.exams.iter().cloned());
        Ok(exams)
    })
}

pub fn replace_exam(
    state: &AppState,
    subject_id: &str,
    exam_id: &str,
    payload: ExamPayload,
) -> Result<AppState, UpdateError> {
    map_subject(state, subject_id, |subject| {
        subject.exam(exam_id).ok_or_else(|| UpdateError::ExamNotFound(exam_id.to_string()))?;
        Ok(subject
            .exams
            .iter()
            .map(|exam| {
                if exam.id == exam_id {
                    ExamEntry::from_payload(exam_id, payload.clone())
                } else {
                    exam.clone()
                }
            })
            .collect())
    })
}

pub fn remove_exam(
    state: &AppState,
    subject_id: &str,
    exam_id: &str,
) -> Result<AppState, UpdateError> {
    map_subject(state, subject_id, |subject| {
        subject.exam(exam_id).ok_or_else(|| UpdateError::ExamNotFound(exam_id.to_string()))?;
        Ok(subject
            .exams
            .iter()
            .filter(|exam| exam.id != exam_id)
            .cloned()
            .collect())
    })
}

fn require_subject<'a>(state: &'a AppState, subject_id: &str) -> Result<&'a Subject, UpdateError> {
    state
        .subject(subject_id)
        .ok_or_else(|| UpdateError::SubjectNotFound(subject_id.to_string()))
}

fn map_subject<F>(state: &AppState, subject_id: &str, rebuild: F) -> Result<AppState, UpdateError>
where
    F: FnOnce(&Subject) -> Result<Vec<ExamEntry>, UpdateError>,
{
    let target = require_subject(state, subject_id)?;
    let exams = rebuild(target)?;
    let subjects = state
        .subjects
        .iter()
        .map(|subject| {
            if subject.id == subject_id {
                Subject {
                    id: subject.id.clone(),
                    name: subject.name.clone(),
                    exams: exams.clone(),
                }
            } else {
                subject.clone()
            }
        })
        .collect();
    Ok(AppState {
        subjects,
        active_subject_id: state.active_subject_id.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exam(id: &str, paper: &str) -> ExamEntry {
        ExamEntry {
            id: id.to_string(),
            paper: paper.to_string(),
            mcq: 1.0,
            essay: 2.0,
            total: 3.0,
            completion: 50.0,
        }
    }

    fn two_subjects() -> AppState {
        AppState {
            subjects: vec![
                Subject {
                    id: "s1".to_string(),
                    name: "Physics".to_string(),
                    exams: vec![exam("e1", "P1")],
                },
                Subject {
                    id: "s2".to_string(),
                    name: "Chemistry".to_string(),
                    exams: Vec::new(),
                },
            ],
            active_subject_id: "s2".to_string(),
        }
    }

    #[test]
    fn add_subject_appends_and_activates() {
        let state = two_subjects();
        let next = add_subject(&state, "s3".to_string(), "  Biology ").expect("add should work");
        assert_eq!(next.subjects.len(), 3);
        assert_eq!(next.subjects[2].name, "Biology");
        assert_eq!(next.active_subject_id, "s3");
        assert_eq!(state.subjects.len(), 2);
    }

    #[test]
    fn add_subject_rejects_blank_names() {
        let err = add_subject(&two_subjects(), "s3".to_string(), "   ")
            .expect_err("blank names should fail");
        assert_eq!(err, UpdateError::BlankSubjectName);
    }

    #[test]
    fn removing_active_subject_activates_first_remaining() {
        let next = remove_subject(&two_subjects(), "s2").expect("remove should work");
        assert_eq!(next.subjects.len(), 1);
        assert_eq!(next.active_subject_id, "s1");
    }

    #[test]
    fn removing_last_subject_is_rejected() {
        let single = remove_subject(&two_subjects(), "s2").expect("remove should work");
        let err = remove_subject(&single, "s1").expect_err("last subject must stay");
        assert_eq!(err, UpdateError::LastSubject);
    }

    #[test]
    fn exam_edits_only_touch_the_target_subject() {
        let state = two_subjects();
        let added = add_exam(&state, "s1", exam("e2", "P2")).expect("add exam should work");
        let papers: Vec<&str> = added.subjects[0]
            .exams
            .iter()
            .map(|e| e.paper.as_str())
            .collect();
        assert_eq!(papers, vec!["P2", "P1"]);
        assert!(added.subjects[1].exams.is_empty());

        let mut payload = exam("ignored", "P2 retake").payload();
        payload.completion = 90.0;
        let replaced = replace_exam(&added, "s1", "e2", payload).expect("replace should work");
        assert_eq!(replaced.subjects[0].exams[0].id, "e2");
        assert_eq!(replaced.subjects[0].exams[0].paper, "P2 retake");
        assert_eq!(replaced.subjects[0].exams[0].completion, 90.0);

        let removed = remove_exam(&replaced, "s1", "e1").expect("remove should work");
        assert_eq!(removed.subjects[0].exams.len(), 1);
    }

    #[test]
    fn unknown_ids_are_reported() {
        let state = two_subjects();
        assert_eq!(
            select_subject(&state, "nope"),
            Err(UpdateError::SubjectNotFound("nope".to_string()))
        );
        assert_eq!(
            remove_exam(&state, "s1", "nope"),
            Err(UpdateError::ExamNotFound("nope".to_string()))
        );
    }
}
