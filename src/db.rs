use std::time::Duration;

use rusqlite::{params, Connection, DatabaseName, OptionalExtension, Result, Row};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

pub const CURRENT_SCHEMA_VERSION: i64 = 2;

struct Migration {
    version: i64,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: [Migration; 2] = [
    Migration {
        version: 1,
        name: "baseline_blob_store_v1",
        sql: r#"
CREATE TABLE IF NOT EXISTS meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS kv (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
"#,
    },
    Migration {
        version: 2,
        name: "row_backend_v1",
        sql: r#"
CREATE TABLE IF NOT EXISTS subjects (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    name TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS exams (
    id TEXT PRIMARY KEY,
    subject_id TEXT NOT NULL REFERENCES subjects(id) ON DELETE CASCADE,
    user_id TEXT NOT NULL,
    paper TEXT NOT NULL,
    mcq REAL NOT NULL DEFAULT 0,
    essay REAL NOT NULL DEFAULT 0,
    total REAL NOT NULL DEFAULT 0,
    completion REAL NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS focus_entries (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    timestamp TEXT NOT NULL,
    occurred_unix INTEGER NOT NULL,
    duration INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_subjects_user ON subjects(user_id);
CREATE INDEX IF NOT EXISTS idx_exams_subject ON exams(subject_id);
CREATE INDEX IF NOT EXISTS idx_focus_user_time ON focus_entries(user_id, occurred_unix);
"#,
    },
];

pub fn open_connection(path: &str) -> Result<Connection> {
    let mut conn = Connection::open(path)?;
    configure_for_speed(&conn)?;
    apply_migrations(&mut conn)?;
    Ok(conn)
}

fn configure_for_speed(conn: &Connection) -> Result<()> {
    conn.pragma_update(None::<DatabaseName>, "journal_mode", "WAL")?;
    conn.pragma_update(None::<DatabaseName>, "synchronous", "NORMAL")?;
    conn.pragma_update(None::<DatabaseName>, "foreign_keys", "ON")?;
    conn.pragma_update(None::<DatabaseName>, "temp_store", "MEMORY")?;
    conn.pragma_update(None::<DatabaseName>, "busy_timeout", 5000i64)?;
    conn.busy_timeout(Duration::from_millis(5000))?;
    Ok(())
}

fn apply_migrations(conn: &mut Connection) -> Result<()> {
    let tx = conn.transaction()?;
    tx.execute_batch(
        r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
    version INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    applied_at TEXT NOT NULL
);
"#,
    )?;

    for migration in MIGRATIONS {
        let already_applied: Option<i64> = tx
            .query_row(
                "SELECT version FROM schema_migrations WHERE version = ?1",
                params![migration.version],
                |row| row.get(0),
            )
            .optional()?;

        if already_applied.is_some() {
            continue;
        }

        tx.execute_batch(migration.sql)?;
        tx.execute(
            "INSERT INTO schema_migrations (version, name, applied_at) VALUES (?1, ?2, ?3)",
            params![migration.version, migration.name, now_utc_rfc3339()],
        )?;
    }

    tx.execute(
        r#"
INSERT INTO meta (key, value)
VALUES ('schema_version', ?1)
ON CONFLICT(key) DO UPDATE SET value = excluded.value
"#,
        params![CURRENT_SCHEMA_VERSION.to_string()],
    )?;

    tx.commit()
}

pub fn now_utc_rfc3339() -> String {
    let now = OffsetDateTime::now_utc();
    now.format(&Rfc3339)
        .unwrap_or_else(|_| now.unix_timestamp().to_string())
}

pub fn get_blob(conn: &Connection, key: &str) -> Result<Option<String>> {
    conn.query_row(
        "SELECT value FROM kv WHERE key = ?1",
        params![key],
        |row| row.get(0),
    )
    .optional()
}

pub fn set_blob(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        r#"
INSERT INTO kv (key, value, updated_at)
VALUES (?1, ?2, ?3)
ON CONFLICT(key) DO UPDATE SET
    value = excluded.value,
    updated_at = excluded.updated_at
"#,
        params![key, value, now_utc_rfc3339()],
    )?;
    Ok(())
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubjectRecord {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExamRecord {
    pub id: String,
    pub subject_id: String,
    pub paper: String,
    pub mcq: f64,
    pub essay: f64,
    pub total: f64,
    pub completion: f64,
}

pub struct ExamColumns<'a> {
    pub paper: &'a str,
    pub mcq: f64,
    pub essay: f64,
    pub total: f64,
    pub completion: f64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FocusRecord {
    pub id: String,
    pub timestamp: String,
    pub duration: i64,
}

/// Subjects in creation order; rowid follows insertion.
pub fn list_subjects(conn: &Connection, user_id: &str) -> Result<Vec<SubjectRecord>> {
    let mut stmt = conn.prepare(
        r#"
SELECT id, name
FROM subjects
WHERE user_id = ?1
ORDER BY rowid ASC
"#,
    )?;
    let mut rows = stmt.query(params![user_id])?;
    let mut result = Vec::new();
    while let Some(row) = rows.next()? {
        result.push(SubjectRecord {
            id: row.get(0)?,
            name: row.get(1)?,
        });
    }
    Ok(result)
}

/// Every exam the user owns, newest first.
pub fn list_exams(conn: &Connection, user_id: &str) -> Result<Vec<ExamRecord>> {
    let mut stmt = conn.prepare(
        r#"
SELECT id, subject_id, paper, mcq, essay, total, completion
FROM exams
WHERE user_id = ?1
ORDER BY rowid DESC
"#,
    )?;
    let mut rows = stmt.query(params![user_id])?;
    let mut result = Vec::new();
    while let Some(row) = rows.next()? {
        result.push(exam_from_row(row)?);
    }
    Ok(result)
}

fn exam_from_row(row: &Row<'_>) -> Result<ExamRecord> {
    Ok(ExamRecord {
        id: row.get(0)?,
        subject_id: row.get(1)?,
        paper: row.get(2)?,
        mcq: row.get(3)?,
        essay: row.get(4)?,
        total: row.get(5)?,
        completion: row.get(6)?,
    })
}

pub fn subject_belongs_to(conn: &Connection, subject_id: &str, user_id: &str) -> Result<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM subjects WHERE id = ?1 AND user_id = ?2)",
        params![subject_id, user_id],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

pub fn insert_subject(conn: &Connection, id: &str, user_id: &str, name: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO subjects (id, user_id, name, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![id, user_id, name, now_utc_rfc3339()],
    )?;
    Ok(())
}

/// Returns the number of deleted subjects; their exams cascade.
pub fn delete_subject(conn: &Connection, subject_id: &str, user_id: &str) -> Result<usize> {
    conn.execute(
        "DELETE FROM subjects WHERE id = ?1 AND user_id = ?2",
        params![subject_id, user_id],
    )
}

pub fn insert_exam(
    conn: &Connection,
    id: &str,
    subject_id: &str,
    user_id: &str,
    columns: &ExamColumns<'_>,
) -> Result<()> {
    conn.execute(
        r#"
INSERT INTO exams (
    id, subject_id, user_id, paper, mcq, essay, total, completion, created_at
)
VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
"#,
        params![
            id,
            subject_id,
            user_id,
            columns.paper,
            columns.mcq,
            columns.essay,
            columns.total,
            columns.completion,
            now_utc_rfc3339()
        ],
    )?;
    Ok(())
}

pub fn update_exam(
    conn: &Connection,
    exam_id: &str,
    user_id: &str,
    columns: &ExamColumns<'_>,
) -> Result<usize> {
    conn.execute(
        r#"
UPDATE exams
SET paper = ?3, mcq = ?4, essay = ?5, total = ?6, completion = ?7
WHERE id = ?1 AND user_id = ?2
"#,
        params![
            exam_id,
            user_id,
            columns.paper,
            columns.mcq,
            columns.essay,
            columns.total,
            columns.completion
        ],
    )
}

pub fn delete_exam(conn: &Connection, exam_id: &str, user_id: &str) -> Result<usize> {
    conn.execute(
        "DELETE FROM exams WHERE id = ?1 AND user_id = ?2",
        params![exam_id, user_id],
    )
}

pub fn insert_focus_entry(
    conn: &Connection,
    id: &str,
    user_id: &str,
    timestamp: &str,
    occurred_unix: i64,
    duration: i64,
) -> Result<()> {
    conn.execute(
        r#"
INSERT INTO focus_entries (id, user_id, timestamp, occurred_unix, duration)
VALUES (?1, ?2, ?3, ?4, ?5)
"#,
        params![id, user_id, timestamp, occurred_unix, duration],
    )?;
    Ok(())
}

/// Entries at or after `since_unix`, oldest first.
pub fn list_focus_entries(
    conn: &Connection,
    user_id: &str,
    since_unix: i64,
) -> Result<Vec<FocusRecord>> {
    let mut stmt = conn.prepare(
        r#"
SELECT id, timestamp, duration
FROM focus_entries
WHERE user_id = ?1 AND occurred_unix >= ?2
ORDER BY occurred_unix ASC, rowid ASC
"#,
    )?;
    let mut rows = stmt.query(params![user_id, since_unix])?;
    let mut result = Vec::new();
    while let Some(row) = rows.next()? {
        result.push(FocusRecord {
            id: row.get(0)?,
            timestamp: row.get(1)?,
            duration: row.get(2)?,
        });
    }
    Ok(result)
}
