use time::OffsetDateTime;

use super::RemoteDashboard;
use crate::app::{AppError, ScoreBook};
use crate::domain::update::UpdateError;
use crate::domain::{ExamEntry, ExamPayload, FocusEntry, Subject};
use crate::normalize::SEED_SUBJECT_NAME;
use crate::payload::ExamForm;
use crate::store::{RowBackend, StoreError};

/// Row backend kept in memory, with one switch that fails every call.
#[derive(Default)]
struct FakeBackend {
    rows: Vec<(String, Subject)>,
    next_id: u32,
    offline: bool,
    calls: usize,
}

impl FakeBackend {
    fn fresh_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}{}", self.next_id)
    }

    fn guard(&mut self) -> Result<(), StoreError> {
        self.calls += 1;
        if self.offline {
            return Err(StoreError::Unavailable("connection refused".to_string()));
        }
        Ok(())
    }

    fn owned_exam(&mut self, exam_id: &str, user_id: &str) -> Result<&mut ExamEntry, StoreError> {
        self.rows
            .iter_mut()
            .filter(|(owner, _)| owner == user_id)
            .flat_map(|(_, subject)| subject.exams.iter_mut())
            .find(|exam| exam.id == exam_id)
            .ok_or(StoreError::NotFound {
                kind: "exam",
                id: exam_id.to_string(),
            })
    }
}

impl RowBackend for FakeBackend {
    fn list_subjects(&self, user_id: &str) -> Result<Vec<Subject>, StoreError> {
        if self.offline {
            return Err(StoreError::Unavailable("connection refused".to_string()));
        }
        Ok(self
            .rows
            .iter()
            .filter(|(owner, _)| owner == user_id)
            .map(|(_, subject)| subject.clone())
            .collect())
    }

    fn insert_exam(
        &mut self,
        subject_id: &str,
        user_id: &str,
        payload: &ExamPayload,
    ) -> Result<(), StoreError> {
        self.guard()?;
        let id = self.fresh_id("e");
        let (_, subject) = self
            .rows
            .iter_mut()
            .find(|(owner, subject)| owner == user_id && subject.id == subject_id)
            .ok_or(StoreError::NotFound {
                kind: "subject",
                id: subject_id.to_string(),
            })?;
        subject
            .exams
            .insert(0, ExamEntry::from_payload(id, payload.clone()));
        Ok(())
    }

    fn update_exam(
        &mut self,
        exam_id: &str,
        user_id: &str,
        payload: &ExamPayload,
    ) -> Result<(), StoreError> {
        self.guard()?;
        let exam = self.owned_exam(exam_id, user_id)?;
        *exam = ExamEntry::from_payload(exam_id, payload.clone());
        Ok(())
    }

    fn delete_exam(&mut self, exam_id: &str, user_id: &str) -> Result<(), StoreError> {
        self.guard()?;
        self.owned_exam(exam_id, user_id)?;
        for (_, subject) in &mut self.rows {
            subject.exams.retain(|exam| exam.id != exam_id);
        }
        Ok(())
    }

    fn insert_subject(&mut self, name: &str, user_id: &str) -> Result<String, StoreError> {
        self.guard()?;
        let id = self.fresh_id("s");
        self.rows.push((
            user_id.to_string(),
            Subject {
                id: id.clone(),
                name: name.to_string(),
                exams: Vec::new(),
            },
        ));
        Ok(id)
    }

    fn delete_subject(&mut self, subject_id: &str, user_id: &str) -> Result<(), StoreError> {
        self.guard()?;
        let before = self.rows.len();
        self.rows
            .retain(|(owner, subject)| !(owner == user_id && subject.id == subject_id));
        if self.rows.len() == before {
            return Err(StoreError::NotFound {
                kind: "subject",
                id: subject_id.to_string(),
            });
        }
        Ok(())
    }

    fn list_focus_entries(
        &self,
        _user_id: &str,
        _since: OffsetDateTime,
    ) -> Result<Vec<FocusEntry>, StoreError> {
        Ok(Vec::new())
    }

    fn insert_focus_entry(
        &mut self,
        _user_id: &str,
        _duration: i64,
        _timestamp: OffsetDateTime,
    ) -> Result<(), StoreError> {
        self.guard()
    }
}

fn form(paper: &str, mcq: &str, essay: &str) -> ExamForm {
    ExamForm {
        paper: paper.to_string(),
        mcq: mcq.to_string(),
        essay: essay.to_string(),
        total: None,
        completion: "70".to_string(),
    }
}

#[test]
fn first_open_creates_a_starter_subject() {
    let dashboard = RemoteDashboard::open(FakeBackend::default(), "u1").expect("open");
    let state = dashboard.state();
    assert_eq!(state.subjects.len(), 1);
    assert_eq!(state.subjects[0].name, SEED_SUBJECT_NAME);
    assert_eq!(state.active_subject_id, state.subjects[0].id);

    let reopened = RemoteDashboard::open(FakeBackend::default(), "u1").expect("open");
    assert_eq!(reopened.state().subjects.len(), 1);
}

#[test]
fn existing_rows_are_loaded_without_seeding() {
    let mut backend = FakeBackend::default();
    backend.insert_subject("Chemistry", "u1").expect("seed");
    backend.insert_subject("Other user", "u2").expect("seed");

    let dashboard = RemoteDashboard::open(backend, "u1").expect("open");
    let names: Vec<&str> = dashboard
        .state()
        .subjects
        .iter()
        .map(|subject| subject.name.as_str())
        .collect();
    assert_eq!(names, vec!["Chemistry"]);
}

#[test]
fn added_exams_come_back_from_the_backend_with_derived_totals() {
    let mut dashboard = RemoteDashboard::open(FakeBackend::default(), "u1").expect("open");
    let mut entry = form(" Mock 1 ", "20", "30");
    entry.total = Some("999".to_string());

    dashboard.add_exam(&entry).expect("add");

    let exams = dashboard.state().active_exams();
    assert_eq!(exams.len(), 1);
    assert_eq!(exams[0].paper, "Mock 1");
    assert_eq!(exams[0].total, 50.0);
    assert_eq!(dashboard.revision(), 1);
}

#[test]
fn update_and_delete_reload_the_subject_list() {
    let mut dashboard = RemoteDashboard::open(FakeBackend::default(), "u1").expect("open");
    dashboard.add_exam(&form("Mock 1", "20", "30")).expect("add");
    let exam_id = dashboard.state().active_exams()[0].id.clone();

    dashboard
        .update_exam(&exam_id, &form("Mock 1b", "25", "30"))
        .expect("update");
    assert_eq!(dashboard.state().active_exams()[0].total, 55.0);

    dashboard.delete_exam(&exam_id).expect("delete");
    assert!(dashboard.state().active_exams().is_empty());
}

#[test]
fn new_subject_becomes_active_and_survives_reload() {
    let mut dashboard = RemoteDashboard::open(FakeBackend::default(), "u1").expect("open");
    let id = dashboard.add_subject("Biology").expect("add subject");
    assert_eq!(dashboard.state().active_subject_id, id);

    dashboard.reload().expect("reload");
    assert_eq!(dashboard.state().active_subject_id, id);

    let err = dashboard.add_subject("   ").expect_err("blank name");
    assert!(matches!(
        err,
        AppError::Update(UpdateError::BlankSubjectName)
    ));
}

#[test]
fn the_last_subject_is_never_deleted() {
    let mut dashboard = RemoteDashboard::open(FakeBackend::default(), "u1").expect("open");
    let only = dashboard.state().subjects[0].id.clone();
    let calls_before = dashboard.backend().calls;

    let err = dashboard.delete_subject(&only).expect_err("last subject");
    assert!(matches!(err, AppError::Update(UpdateError::LastSubject)));
    assert_eq!(dashboard.backend().calls, calls_before);

    let other = dashboard.add_subject("Maths").expect("add");
    dashboard.delete_subject(&other).expect("delete");
    assert_eq!(dashboard.state().active_subject_id, only);
}

#[test]
fn selecting_a_subject_stays_local() {
    let mut dashboard = RemoteDashboard::open(FakeBackend::default(), "u1").expect("open");
    let first = dashboard.state().subjects[0].id.clone();
    dashboard.add_subject("Maths").expect("add");
    let calls_before = dashboard.backend().calls;

    dashboard.select_subject(&first).expect("select");
    assert_eq!(dashboard.state().active_subject_id, first);
    assert_eq!(dashboard.backend().calls, calls_before);
    assert!(dashboard.select_subject("missing").is_err());
}

#[test]
fn backend_failure_keeps_last_good_state_and_reports_it() {
    let mut dashboard = RemoteDashboard::open(FakeBackend::default(), "u1").expect("open");
    dashboard.add_exam(&form("Mock 1", "1", "2")).expect("add");
    let before = dashboard.state().clone();
    let revision = dashboard.revision();

    dashboard.backend.offline = true;
    let err = dashboard
        .add_exam(&form("Mock 2", "1", "2"))
        .expect_err("offline");
    assert!(matches!(err, AppError::Store(StoreError::Unavailable(_))));
    assert_eq!(dashboard.state(), &before);
    assert_eq!(dashboard.revision(), revision);
    assert_eq!(
        dashboard.last_error(),
        Some("storage error: backend unavailable: connection refused")
    );

    dashboard.backend.offline = false;
    dashboard.add_exam(&form("Mock 2", "1", "2")).expect("retry");
    assert_eq!(dashboard.last_error(), None);
    assert_eq!(dashboard.state().active_exams().len(), 2);
}

#[test]
fn incomplete_form_never_reaches_the_backend() {
    let mut dashboard = RemoteDashboard::open(FakeBackend::default(), "u1").expect("open");
    let calls_before = dashboard.backend().calls;
    let err = dashboard
        .add_exam(&form("", "1", "2"))
        .expect_err("blank paper");
    assert!(matches!(err, AppError::IncompleteExam));
    assert_eq!(dashboard.backend().calls, calls_before);
}
