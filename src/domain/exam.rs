use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExamEntry {
    pub id: String,
    pub paper: String,
    pub mcq: f64,
    pub essay: f64,
    pub total: f64,
    pub completion: f64,
}

/// An exam record as entered by the user, before it is assigned an id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExamPayload {
    pub paper: String,
    pub mcq: f64,
    pub essay: f64,
    pub total: f64,
    pub completion: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    pub id: String,
    pub name: String,
    pub exams: Vec<ExamEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AppState {
    pub subjects: Vec<Subject>,
    pub active_subject_id: String,
}

impl ExamEntry {
    pub fn from_payload(id: impl Into<String>, payload: ExamPayload) -> Self {
        Self {
            id: id.into(),
            paper: payload.paper,
            mcq: payload.mcq,
            essay: payload.essay,
            total: payload.total,
            completion: payload.completion,
        }
    }

    pub fn payload(&self) -> ExamPayload {
        ExamPayload {
            paper: self.paper.clone(),
            mcq: self.mcq,
            essay: self.essay,
            total: self.total,
            completion: self.completion,
        }
    }
}

impl Subject {
    pub fn exam(&self, exam_id: &str) -> Option<&ExamEntry> {
        self.exams.iter().find(|exam| exam.id == exam_id)
    }
}

impl AppState {
    pub fn subject(&self, subject_id: &str) -> Option<&Subject> {
        self.subjects
            .iter()
            .find(|subject| subject.id == subject_id)
    }

    /// The subject named by `active_subject_id`, or the first subject when the
    /// id does not resolve.
    pub fn active_subject(&self) -> Option<&Subject> {
        self.subject(&self.active_subject_id)
            .or_else(|| self.subjects.first())
    }

    pub fn active_exams(&self) -> &[ExamEntry] {
        self.active_subject()
            .map(|subject| subject.exams.as_slice())
            .unwrap_or(&[])
    }
}

/// Clamps a completion percentage into `[0, 100]`; non-finite values become 0.
pub fn clamp_completion(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 100.0)
    } else {
        0.0
    }
}

/// Resolves an exam total: an explicit value wins, otherwise `mcq + essay`.
pub fn resolve_total(explicit: Option<f64>, mcq: f64, essay: f64) -> f64 {
    match explicit {
        Some(total) if total.is_finite() => total,
        _ => mcq + essay,
    }
}
