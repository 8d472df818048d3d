use serde_json::{json, Value};

use super::{AppError, LocalDashboard, ScoreBook};
use crate::domain::update::UpdateError;
use crate::normalize::{normalize_value, Origin};
use crate::payload::ExamForm;
use crate::store::{KeyValueStore, MemoryKvStore, StoreError};

const KEY: &str = "exam-tracker-state";

fn form(paper: &str, mcq: &str, essay: &str, completion: &str) -> ExamForm {
    ExamForm {
        paper: paper.to_string(),
        mcq: mcq.to_string(),
        essay: essay.to_string(),
        total: None,
        completion: completion.to_string(),
    }
}

fn stored_blob() -> Value {
    json!({
        "subjects": [
            {"id": "s1", "name": "Physics", "exams": [
                {"id": "e1", "paper": "2024 P1", "mcq": 30, "essay": 40, "total": 70, "completion": 80}
            ]},
            {"id": "s2", "name": "Maths", "exams": []}
        ],
        "activeSubjectId": "s1"
    })
}

/// Accepts reads, then fails every write once `fail_writes` is set.
struct FlakyStore {
    inner: MemoryKvStore,
    fail_writes: bool,
}

impl KeyValueStore for FlakyStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        self.inner.get(key)
    }

    fn set(&mut self, key: &str, value: &Value) -> Result<(), StoreError> {
        if self.fail_writes {
            return Err(StoreError::Unavailable("disk full".to_string()));
        }
        self.inner.set(key, value)
    }
}

#[test]
fn opening_an_empty_store_seeds_and_persists_default_state() {
    let dashboard = LocalDashboard::open(MemoryKvStore::default(), KEY).expect("open");
    assert_eq!(dashboard.store().writes(), 1);
    assert_eq!(dashboard.state().subjects.len(), 1);

    let persisted = dashboard
        .store()
        .get(KEY)
        .expect("get")
        .expect("state should be stored");
    assert_eq!(normalize_value(Some(&persisted)).origin, Origin::Intact);
}

#[test]
fn opening_a_valid_blob_skips_the_redundant_write() {
    let store = MemoryKvStore::with_value(KEY, stored_blob());
    let dashboard = LocalDashboard::open(store, KEY).expect("open");
    assert_eq!(dashboard.store().writes(), 0);
    assert_eq!(dashboard.state().active_subject_id, "s1");
    assert_eq!(dashboard.revision(), 0);
}

#[test]
fn legacy_blob_is_upgraded_on_open() {
    let store = MemoryKvStore::with_value(KEY, json!([{"paper": "Old", "mcq": 3}]));
    let dashboard = LocalDashboard::open(store, KEY).expect("open");
    assert_eq!(dashboard.store().writes(), 1);
    assert_eq!(dashboard.state().active_exams()[0].paper, "Old");
}

#[test]
fn add_exam_prepends_to_active_subject_and_persists() {
    let store = MemoryKvStore::with_value(KEY, stored_blob());
    let mut dashboard = LocalDashboard::open(store, KEY).expect("open");

    dashboard
        .add_exam(&form("Math P1", "10", "2", "150"))
        .expect("add should succeed");

    let exams = dashboard.state().active_exams();
    assert_eq!(exams.len(), 2);
    assert_eq!(exams[0].paper, "Math P1");
    assert_eq!(exams[0].total, 12.0);
    assert_eq!(exams[0].completion, 100.0);
    assert_eq!(dashboard.revision(), 1);

    let persisted = dashboard.store().get(KEY).expect("get").expect("stored");
    let reloaded = normalize_value(Some(&persisted));
    assert_eq!(reloaded.origin, Origin::Intact);
    assert_eq!(&reloaded.state, dashboard.state());
}

#[test]
fn incomplete_exam_is_rejected_without_saving() {
    let store = MemoryKvStore::with_value(KEY, stored_blob());
    let mut dashboard = LocalDashboard::open(store, KEY).expect("open");
    let before = dashboard.state().clone();

    let err = dashboard
        .add_exam(&form("   ", "10", "2", "50"))
        .expect_err("blank paper should fail");
    assert!(matches!(err, AppError::IncompleteExam));
    assert_eq!(dashboard.state(), &before);
    assert_eq!(dashboard.store().writes(), 0);
}

#[test]
fn update_and_delete_target_the_active_subject() {
    let store = MemoryKvStore::with_value(KEY, stored_blob());
    let mut dashboard = LocalDashboard::open(store, KEY).expect("open");

    let mut edit = form("2024 P1 (marked)", "31", "40", "90");
    edit.total = Some("75".to_string());
    dashboard.update_exam("e1", &edit).expect("update");
    let exam = &dashboard.state().active_exams()[0];
    assert_eq!(exam.id, "e1");
    assert_eq!(exam.total, 75.0);

    dashboard.delete_exam("e1").expect("delete");
    assert!(dashboard.state().active_exams().is_empty());

    let missing = dashboard.delete_exam("e1").expect_err("already gone");
    assert!(matches!(
        missing,
        AppError::Update(UpdateError::ExamNotFound(_))
    ));
}

#[test]
fn subjects_can_be_added_selected_and_removed_but_never_emptied() {
    let store = MemoryKvStore::with_value(KEY, stored_blob());
    let mut dashboard = LocalDashboard::open(store, KEY).expect("open");

    let id = dashboard.add_subject("Biology").expect("add subject");
    assert_eq!(dashboard.state().active_subject_id, id);

    dashboard.select_subject("s2").expect("select");
    assert_eq!(dashboard.state().active_subject_id, "s2");

    dashboard.delete_subject("s2").expect("delete");
    dashboard.delete_subject(&id).expect("delete");
    assert_eq!(dashboard.state().active_subject_id, "s1");

    let err = dashboard.delete_subject("s1").expect_err("last subject stays");
    assert!(matches!(err, AppError::Update(UpdateError::LastSubject)));
    assert_eq!(dashboard.state().subjects.len(), 1);
}

#[test]
fn failed_write_leaves_the_last_good_state() {
    let store = FlakyStore {
        inner: MemoryKvStore::with_value(KEY, stored_blob()),
        fail_writes: false,
    };
    let mut dashboard = LocalDashboard::open(store, KEY).expect("open");
    let before = dashboard.state().clone();
    dashboard.store.fail_writes = true;

    let err = dashboard
        .add_exam(&form("P9", "1", "1", "1"))
        .expect_err("write should fail");
    assert!(matches!(err, AppError::Store(StoreError::Unavailable(_))));
    assert_eq!(dashboard.state(), &before);
    assert_eq!(dashboard.revision(), 0);
    assert_eq!(dashboard.last_error(), Some("backend unavailable: disk full"));

    dashboard.store.fail_writes = false;
    dashboard
        .add_exam(&form("P9", "1", "1", "1"))
        .expect("write should succeed again");
    assert_eq!(dashboard.last_error(), None);
}
