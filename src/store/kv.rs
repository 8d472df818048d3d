use std::collections::HashMap;

use rusqlite::Connection;
use serde_json::Value;
use tracing::{debug, warn};

use super::{KeyValueStore, StoreError};
use crate::db;

/// Blob store in the `kv` table of the local SQLite file.
pub struct SqliteKvStore {
    conn: Connection,
}

impl SqliteKvStore {
    pub fn open(db_path: &str) -> Result<Self, StoreError> {
        Ok(Self {
            conn: db::open_connection(db_path)?,
        })
    }
}

impl KeyValueStore for SqliteKvStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let Some(raw) = db::get_blob(&self.conn, key)? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(err) => {
                warn!(key, error = %err, "stored blob is not valid JSON");
                Ok(Some(Value::String(raw)))
            }
        }
    }

    fn set(&mut self, key: &str, value: &Value) -> Result<(), StoreError> {
        let encoded = serde_json::to_string(value)?;
        db::set_blob(&self.conn, key, &encoded)?;
        debug!(key, bytes = encoded.len(), "persisted blob");
        Ok(())
    }
}

/// Process-local blob store.
#[derive(Debug, Clone, Default)]
pub struct MemoryKvStore {
    values: HashMap<String, Value>,
    writes: usize,
}

impl MemoryKvStore {
    pub fn with_value(key: &str, value: Value) -> Self {
        let mut values = HashMap::new();
        values.insert(key.to_string(), value);
        Self { values, writes: 0 }
    }

    /// Number of `set` calls served so far.
    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl KeyValueStore for MemoryKvStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &Value) -> Result<(), StoreError> {
        self.values.insert(key.to_string(), value.clone());
        self.writes += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};
    use uuid::Uuid;

    use super::{KeyValueStore, MemoryKvStore, SqliteKvStore};
    use crate::db;

    #[test]
    fn sqlite_store_round_trips_json_and_surfaces_garbage_as_text() {
        let path = std::env::temp_dir()
            .join(format!("scorepad-kv-{}.sqlite", Uuid::now_v7()))
            .display()
            .to_string();
        let mut store = SqliteKvStore::open(&path).expect("store should open");

        assert_eq!(store.get("k").expect("get"), None);
        store.set("k", &json!({"subjects": []})).expect("set");
        assert_eq!(store.get("k").expect("get"), Some(json!({"subjects": []})));

        let conn = db::open_connection(&path).expect("second connection");
        db::set_blob(&conn, "k", "{not json").expect("raw write");
        assert_eq!(
            store.get("k").expect("get"),
            Some(Value::String("{not json".to_string()))
        );

        for suffix in ["", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{path}{suffix}"));
        }
    }

    #[test]
    fn memory_store_counts_writes() {
        let mut store = MemoryKvStore::with_value("k", json!(1));
        assert_eq!(store.get("k").expect("get"), Some(json!(1)));
        store.set("k", &json!(2)).expect("set");
        assert_eq!(store.writes(), 1);
        assert_eq!(store.get("missing").expect("get"), None);
    }
}
