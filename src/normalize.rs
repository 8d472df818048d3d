//! Turns untrusted persisted data into a valid [`AppState`].
//!
//! Two passes are kept apart: the `is_valid_*` checks decide whether a value
//! can be trusted as-is, and the sanitizers coerce anything else field by
//! field. A value is either valid or repaired, never partially trusted.

use std::borrow::Cow;
use std::collections::HashSet;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::domain::exam::{clamp_completion, resolve_total};
use crate::domain::{AppState, ExamEntry, Subject};
use crate::ids;

pub const SEED_SUBJECT_NAME: &str = "Physics";

const SEED_EXAMS: [(&str, f64, f64, f64); 4] = [
    ("2024 Paper 1", 34.0, 42.0, 85.0),
    ("2023 Paper 2", 30.0, 38.0, 70.0),
    ("2022 Paper 1", 27.0, 35.0, 55.0),
    ("2021 Paper 2", 25.0, 31.0, 40.0),
];

/// How a normalized state was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// The input already satisfied every invariant and was decoded unchanged.
    Intact,
    /// A `subjects` array was sanitized subject by subject.
    Repaired,
    /// A bare exam array was wrapped into a single subject.
    Legacy,
    /// Nothing usable; the seeded default state was produced.
    Default,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    pub state: AppState,
    pub origin: Origin,
}

impl Normalized {
    /// Whether the normalized state differs from what was persisted.
    pub fn needs_write(&self) -> bool {
        self.origin != Origin::Intact
    }
}

/// Normalizes a decoded blob; `None` stands for an absent value. Never fails.
pub fn normalize_value(raw: Option<&Value>) -> Normalized {
    let Some(raw) = raw else {
        return seeded(Origin::Default);
    };

    if is_valid_app_state(raw) {
        if let Ok(state) = serde_json::from_value::<AppState>(raw.clone()) {
            return Normalized {
                state,
                origin: Origin::Intact,
            };
        }
    }

    if let Some(subjects) = raw.get("subjects").and_then(Value::as_array) {
        let requested_active = raw.get("activeSubjectId").and_then(Value::as_str);
        return repair_subjects(subjects, requested_active);
    }

    if let Some(items) = raw.as_array() {
        let mut taken = HashSet::new();
        let exams = sanitize_exams(items, &mut taken);
        let id = ids::new_id();
        debug!(exams = exams.len(), "wrapped legacy exam list into a subject");
        return Normalized {
            state: AppState {
                subjects: vec![Subject {
                    id: id.clone(),
                    name: SEED_SUBJECT_NAME.to_string(),
                    exams,
                }],
                active_subject_id: id,
            },
            origin: Origin::Legacy,
        };
    }

    seeded(Origin::Default)
}

/// Normalizes an already-typed state. Valid input is handed back borrowed, so
/// callers can detect "nothing changed" without comparing contents.
pub fn normalize_state(state: &AppState) -> Cow<'_, AppState> {
    if state_is_valid(state) {
        return Cow::Borrowed(state);
    }
    let value = serde_json::to_value(state).unwrap_or(Value::Null);
    Cow::Owned(normalize_value(Some(&value)).state)
}

/// One seed subject with the example papers.
pub fn default_state() -> AppState {
    let id = ids::new_id();
    let exams = SEED_EXAMS
        .iter()
        .map(|(paper, mcq, essay, completion)| ExamEntry {
            id: ids::new_id(),
            paper: (*paper).to_string(),
            mcq: *mcq,
            essay: *essay,
            total: mcq + essay,
            completion: *completion,
        })
        .collect();
    AppState {
        subjects: vec![Subject {
            id: id.clone(),
            name: SEED_SUBJECT_NAME.to_string(),
            exams,
        }],
        active_subject_id: id,
    }
}

fn seeded(origin: Origin) -> Normalized {
    Normalized {
        state: default_state(),
        origin,
    }
}

pub fn is_valid_exam(value: &Value) -> bool {
    let Some(obj) = value.as_object() else {
        return false;
    };
    non_blank(obj.get("id")).is_some()
        && non_blank(obj.get("paper")).is_some()
        && ["mcq", "essay", "total"]
            .iter()
            .all(|key| strict_number(obj.get(*key)).is_some())
        && strict_number(obj.get("completion"))
            .is_some_and(|completion| (0.0..=100.0).contains(&completion))
}

pub fn is_valid_subject(value: &Value) -> bool {
    let Some(obj) = value.as_object() else {
        return false;
    };
    if non_blank(obj.get("id")).is_none() || non_blank(obj.get("name")).is_none() {
        return false;
    }
    let Some(exams) = obj.get("exams").and_then(Value::as_array) else {
        return false;
    };
    exams.iter().all(is_valid_exam) && ids_are_unique(exams)
}

pub fn is_valid_app_state(value: &Value) -> bool {
    let Some(subjects) = value.get("subjects").and_then(Value::as_array) else {
        return false;
    };
    if subjects.is_empty() || !subjects.iter().all(is_valid_subject) || !ids_are_unique(subjects)
    {
        return false;
    }
    let Some(active) = value.get("activeSubjectId").and_then(Value::as_str) else {
        return false;
    };
    subjects
        .iter()
        .any(|subject| subject.get("id").and_then(Value::as_str) == Some(active))
}

fn state_is_valid(state: &AppState) -> bool {
    if state.subjects.is_empty() {
        return false;
    }
    let mut subject_ids = HashSet::new();
    for subject in &state.subjects {
        if subject.id.trim().is_empty()
            || subject.name.trim().is_empty()
            || !subject_ids.insert(subject.id.as_str())
        {
            return false;
        }
        let mut exam_ids = HashSet::new();
        for exam in &subject.exams {
            let numbers_ok = [exam.mcq, exam.essay, exam.total]
                .iter()
                .all(|value| value.is_finite());
            if exam.id.trim().is_empty()
                || exam.paper.trim().is_empty()
                || !numbers_ok
                || !(0.0..=100.0).contains(&exam.completion)
                || !exam_ids.insert(exam.id.as_str())
            {
                return false;
            }
        }
    }
    subject_ids.contains(state.active_subject_id.as_str())
}

fn repair_subjects(raw_subjects: &[Value], requested_active: Option<&str>) -> Normalized {
    let mut taken = HashSet::new();
    let subjects: Vec<Subject> = raw_subjects
        .iter()
        .enumerate()
        .filter_map(|(index, value)| sanitize_subject(index, value, &mut taken))
        .collect();

    let dropped = raw_subjects.len() - subjects.len();
    if subjects.is_empty() {
        warn!(dropped, "no recoverable subjects; falling back to default state");
        return seeded(Origin::Default);
    }
    if dropped > 0 {
        warn!(dropped, "dropped unrecoverable subjects");
    }

    let active_subject_id = requested_active
        .filter(|active| subjects.iter().any(|subject| subject.id == *active))
        .map(str::to_string)
        .unwrap_or_else(|| subjects[0].id.clone());

    debug!(subjects = subjects.len(), "repaired persisted state");
    Normalized {
        state: AppState {
            subjects,
            active_subject_id,
        },
        origin: Origin::Repaired,
    }
}

fn sanitize_subject(index: usize, value: &Value, taken: &mut HashSet<String>) -> Option<Subject> {
    let obj = value.as_object()?;
    let name = non_blank(obj.get("name"))
        .map(str::to_string)
        .unwrap_or_else(|| format!("Subject {}", index + 1));
    let id = claim_id(obj, taken);

    let mut exam_ids = HashSet::new();
    let exams = obj
        .get("exams")
        .and_then(Value::as_array)
        .map(|items| sanitize_exams(items, &mut exam_ids))
        .unwrap_or_default();

    Some(Subject { id, name, exams })
}

fn sanitize_exams(items: &[Value], taken: &mut HashSet<String>) -> Vec<ExamEntry> {
    let exams: Vec<ExamEntry> = items
        .iter()
        .enumerate()
        .filter_map(|(index, value)| sanitize_exam(index, value, taken))
        .collect();
    if exams.len() < items.len() {
        debug!(
            dropped = items.len() - exams.len(),
            "dropped unrecoverable exams"
        );
    }
    exams
}

fn sanitize_exam(index: usize, value: &Value, taken: &mut HashSet<String>) -> Option<ExamEntry> {
    let obj = value.as_object()?;
    let paper = non_blank(obj.get("paper"))
        .map(str::to_string)
        .unwrap_or_else(|| format!("Paper {}", index + 1));
    let mcq = lenient_number(obj.get("mcq")).unwrap_or(0.0);
    let essay = lenient_number(obj.get("essay")).unwrap_or(0.0);
    let total = resolve_total(lenient_number(obj.get("total")), mcq, essay);
    let completion = clamp_completion(lenient_number(obj.get("completion")).unwrap_or(0.0));
    let id = claim_id(obj, taken);

    Some(ExamEntry {
        id,
        paper,
        mcq,
        essay,
        total,
        completion,
    })
}

/// Keeps the record's own id, untrimmed, when it is usable and unclaimed,
/// otherwise mints one.
fn claim_id(obj: &Map<String, Value>, taken: &mut HashSet<String>) -> String {
    if let Some(existing) = raw_id(obj.get("id")) {
        if taken.insert(existing.to_string()) {
            return existing.to_string();
        }
    }
    let fresh = ids::unique_id(|candidate| taken.contains(candidate));
    taken.insert(fresh.clone());
    fresh
}

fn ids_are_unique(items: &[Value]) -> bool {
    let mut seen = HashSet::new();
    items
        .iter()
        .filter_map(|item| item.get("id").and_then(Value::as_str))
        .all(|id| seen.insert(id))
}

/// The stored id exactly as written, as long as it is not blank.
fn raw_id(value: Option<&Value>) -> Option<&str> {
    let id = value?.as_str()?;
    if id.trim().is_empty() {
        None
    } else {
        Some(id)
    }
}

fn non_blank(value: Option<&Value>) -> Option<&str> {
    let trimmed = value?.as_str()?.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

fn strict_number(value: Option<&Value>) -> Option<f64> {
    value?.as_f64().filter(|number| number.is_finite())
}

/// Numbers, or strings that parse as finite numbers.
fn lenient_number(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(number) => number.as_f64().filter(|n| n.is_finite()),
        Value::String(text) => text
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite()),
        _ => None,
    }
}
