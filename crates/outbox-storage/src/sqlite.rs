//! SQLite-backed key-value store.

use crate::lock::StoreLock;
use crate::{KeyValueStore, StorageError, StorageResult};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

/// Store that keeps every key in one `kv_store` table.
pub struct SqliteKeyValueStore {
    conn: Mutex<Connection>,
    _lock: Option<StoreLock>,
}

impl SqliteKeyValueStore {
    /// Open a database at the given path, creating the table if needed.
    ///
    /// `<path>.lock` is held until the store is dropped; a second open of the
    /// same database fails with [`StorageError::Locked`].
    pub fn open(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let lock = StoreLock::acquire(lock_path(path))?;

        let conn = Connection::open(path)?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = FULL;
            PRAGMA busy_timeout = 5000;
        ",
        )?;
        Self::from_connection(conn, Some(lock))
    }

    /// Open an in-memory database for testing.
    pub fn open_in_memory() -> StorageResult<Self> {
        Self::from_connection(Connection::open_in_memory()?, None)
    }

    fn from_connection(conn: Connection, lock: Option<StoreLock>) -> StorageResult<Self> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS kv_store (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            )",
            [],
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
            _lock: lock,
        })
    }

    fn conn(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StorageError::Backend("sqlite connection lock poisoned".to_string()))
    }
}

fn lock_path(db_path: &Path) -> PathBuf {
    let mut name = db_path.as_os_str().to_owned();
    name.push(".lock");
    PathBuf::from(name)
}

impl KeyValueStore for SqliteKeyValueStore {
    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        self.conn()?.execute(
            "INSERT INTO kv_store (key, value, updated_at) VALUES (?1, ?2, datetime('now'))
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value],
        )?;
        debug!(key, bytes = value.len(), "Stored value");
        Ok(())
    }

    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let value = self
            .conn()?
            .query_row(
                "SELECT value FROM kv_store WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn delete(&self, key: &str) -> StorageResult<bool> {
        let removed = self
            .conn()?
            .execute("DELETE FROM kv_store WHERE key = ?1", params![key])?;
        Ok(removed > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_in_memory_roundtrip() {
        let store = SqliteKeyValueStore::open_in_memory().unwrap();

        assert_eq!(store.get("missing").unwrap(), None);
        store.set("k", "v1").unwrap();
        store.set("k", "v2").unwrap();
        assert_eq!(store.get("k").unwrap(), Some("v2".to_string()));
        assert!(store.delete("k").unwrap());
        assert!(!store.has("k").unwrap());
    }

    #[test]
    fn test_values_survive_reopen() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("nested").join("outbox.sqlite");

        {
            let store = SqliteKeyValueStore::open(&db_path).unwrap();
            store.set("offlineRequests", r#"[{"url":"x"}]"#).unwrap();
        }

        let reopened = SqliteKeyValueStore::open(&db_path).unwrap();
        assert_eq!(
            reopened.get("offlineRequests").unwrap(),
            Some(r#"[{"url":"x"}]"#.to_string())
        );
    }

    #[test]
    fn test_database_has_one_owner() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("outbox.sqlite");

        let store = SqliteKeyValueStore::open(&db_path).unwrap();
        assert!(matches!(
            SqliteKeyValueStore::open(&db_path),
            Err(StorageError::Locked(ref p)) if p == &dir.path().join("outbox.sqlite.lock")
        ));

        drop(store);
        assert!(SqliteKeyValueStore::open(&db_path).is_ok());
    }

    #[test]
    fn test_keys_are_independent() {
        let store = SqliteKeyValueStore::open_in_memory().unwrap();
        store.set("a", "1").unwrap();
        store.set("b", "2").unwrap();

        assert!(store.delete("a").unwrap());
        assert_eq!(store.get("b").unwrap(), Some("2".to_string()));
    }
}
