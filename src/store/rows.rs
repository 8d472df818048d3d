use std::collections::HashMap;

use rusqlite::Connection;
use time::OffsetDateTime;
use tracing::debug;

use super::{RowBackend, StoreError};
use crate::db::{self, ExamColumns};
use crate::domain::focus::format_timestamp;
use crate::domain::{ExamEntry, ExamPayload, FocusEntry, Subject};
use crate::ids;

/// Row backend over the `subjects`, `exams`, and `focus_entries` tables.
pub struct SqliteBackend {
    conn: Connection,
}

impl SqliteBackend {
    pub fn open(db_path: &str) -> Result<Self, StoreError> {
        Ok(Self {
            conn: db::open_connection(db_path)?,
        })
    }
}

fn columns(payload: &ExamPayload) -> ExamColumns<'_> {
    ExamColumns {
        paper: &payload.paper,
        mcq: payload.mcq,
        essay: payload.essay,
        total: payload.total,
        completion: payload.completion,
    }
}

fn expect_one(affected: usize, kind: &'static str, id: &str) -> Result<(), StoreError> {
    if affected == 0 {
        return Err(StoreError::NotFound {
            kind,
            id: id.to_string(),
        });
    }
    Ok(())
}

impl RowBackend for SqliteBackend {
    fn list_subjects(&self, user_id: &str) -> Result<Vec<Subject>, StoreError> {
        let mut exams_by_subject: HashMap<String, Vec<ExamEntry>> = HashMap::new();
        for record in db::list_exams(&self.conn, user_id)? {
            exams_by_subject
                .entry(record.subject_id)
                .or_default()
                .push(ExamEntry {
                    id: record.id,
                    paper: record.paper,
                    mcq: record.mcq,
                    essay: record.essay,
                    total: record.total,
                    completion: record.completion,
                });
        }

        Ok(db::list_subjects(&self.conn, user_id)?
            .into_iter()
            .map(|record| Subject {
                exams: exams_by_subject.remove(&record.id).unwrap_or_default(),
                id: record.id,
                name: record.name,
            })
            .collect())
    }

    fn insert_exam(
        &mut self,
        subject_id: &str,
        user_id: &str,
        payload: &ExamPayload,
    ) -> Result<(), StoreError> {
        if !db::subject_belongs_to(&self.conn, subject_id, user_id)? {
            return Err(StoreError::NotFound {
                kind: "subject",
                id: subject_id.to_string(),
            });
        }
        let id = ids::new_id();
        db::insert_exam(&self.conn, &id, subject_id, user_id, &columns(payload))?;
        debug!(exam_id = %id, subject_id, "inserted exam row");
        Ok(())
    }

    fn update_exam(
        &mut self,
        exam_id: &str,
        user_id: &str,
        payload: &ExamPayload,
    ) -> Result<(), StoreError> {
        let affected = db::update_exam(&self.conn, exam_id, user_id, &columns(payload))?;
        expect_one(affected, "exam", exam_id)
    }

    fn delete_exam(&mut self, exam_id: &str, user_id: &str) -> Result<(), StoreError> {
        let affected = db::delete_exam(&self.conn, exam_id, user_id)?;
        expect_one(affected, "exam", exam_id)
    }

    fn insert_subject(&mut self, name: &str, user_id: &str) -> Result<String, StoreError> {
        let id = ids::new_id();
        db::insert_subject(&self.conn, &id, user_id, name)?;
        debug!(subject_id = %id, "inserted subject row");
        Ok(id)
    }

    fn delete_subject(&mut self, subject_id: &str, user_id: &str) -> Result<(), StoreError> {
        let affected = db::delete_subject(&self.conn, subject_id, user_id)?;
        expect_one(affected, "subject", subject_id)
    }

    fn list_focus_entries(
        &self,
        user_id: &str,
        since: OffsetDateTime,
    ) -> Result<Vec<FocusEntry>, StoreError> {
        Ok(
            db::list_focus_entries(&self.conn, user_id, since.unix_timestamp())?
                .into_iter()
                .map(|record| FocusEntry {
                    id: record.id,
                    timestamp: record.timestamp,
                    duration: record.duration,
                })
                .collect(),
        )
    }

    fn insert_focus_entry(
        &mut self,
        user_id: &str,
        duration: i64,
        timestamp: OffsetDateTime,
    ) -> Result<(), StoreError> {
        db::insert_focus_entry(
            &self.conn,
            &ids::new_id(),
            user_id,
            &format_timestamp(timestamp),
            timestamp.unix_timestamp(),
            duration,
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use time::format_description::well_known::Rfc3339;
    use time::OffsetDateTime;
    use uuid::Uuid;

    use super::SqliteBackend;
    use crate::domain::ExamPayload;
    use crate::store::{RowBackend, StoreError};

    fn temp_backend() -> (SqliteBackend, String) {
        let path = std::env::temp_dir()
            .join(format!("scorepad-rows-{}.sqlite", Uuid::now_v7()))
            .display()
            .to_string();
        (SqliteBackend::open(&path).expect("backend should open"), path)
    }

    fn cleanup(path: &str) {
        for suffix in ["", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{path}{suffix}"));
        }
    }

    fn payload(paper: &str) -> ExamPayload {
        ExamPayload {
            paper: paper.to_string(),
            mcq: 12.0,
            essay: 8.0,
            total: 20.0,
            completion: 75.0,
        }
    }

    #[test]
    fn nests_exams_under_their_subjects() {
        let (mut backend, path) = temp_backend();
        let physics = backend.insert_subject("Physics", "u1").expect("subject");
        let maths = backend.insert_subject("Maths", "u1").expect("subject");
        backend
            .insert_exam(&physics, "u1", &payload("P1"))
            .expect("exam");
        backend
            .insert_exam(&physics, "u1", &payload("P2"))
            .expect("exam");

        let subjects = backend.list_subjects("u1").expect("list");
        assert_eq!(subjects.len(), 2);
        assert_eq!(subjects[0].id, physics);
        assert_eq!(subjects[1].id, maths);
        let papers: Vec<&str> = subjects[0].exams.iter().map(|e| e.paper.as_str()).collect();
        assert_eq!(papers, vec!["P2", "P1"]);
        assert!(subjects[1].exams.is_empty());

        cleanup(&path);
    }

    #[test]
    fn rejects_rows_owned_by_someone_else() {
        let (mut backend, path) = temp_backend();
        let subject = backend.insert_subject("Physics", "owner").expect("subject");

        let err = backend
            .insert_exam(&subject, "intruder", &payload("P1"))
            .expect_err("foreign subject should be rejected");
        assert!(matches!(err, StoreError::NotFound { kind: "subject", .. }));

        backend
            .insert_exam(&subject, "owner", &payload("P1"))
            .expect("exam");
        let exam_id = backend.list_subjects("owner").expect("list")[0].exams[0]
            .id
            .clone();
        assert!(backend.delete_exam(&exam_id, "intruder").is_err());
        assert!(backend.update_exam("missing", "owner", &payload("x")).is_err());
        backend.delete_exam(&exam_id, "owner").expect("delete");

        cleanup(&path);
    }

    #[test]
    fn focus_entries_respect_the_since_bound() {
        let (mut backend, path) = temp_backend();
        let at = |raw: &str| OffsetDateTime::parse(raw, &Rfc3339).expect("timestamp");

        backend
            .insert_focus_entry("u1", 1500, at("2026-02-24T10:00:00+02:00"))
            .expect("insert");
        backend
            .insert_focus_entry("u1", 900, at("2025-09-01T10:00:00Z"))
            .expect("insert");

        let entries = backend
            .list_focus_entries("u1", at("2026-01-01T00:00:00Z"))
            .expect("list");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].duration, 1500);
        assert_eq!(entries[0].timestamp, "2026-02-24T10:00:00+02:00");

        cleanup(&path);
    }
}
