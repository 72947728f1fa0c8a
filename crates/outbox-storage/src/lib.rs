//! Durable storage for the offline outbox.
//!
//! This crate provides [`KeyValueStore`] backends:
//! - **File**: one file per key, replaced atomically via temp file + rename
//! - **SQLite**: a single `kv_store` table via `rusqlite`
//! - **Memory**: process-local map, for tests and ephemeral hosts
//!
//! The on-disk backends hold an exclusive lock file while open, so one
//! process at a time owns a store.

mod file;
mod keys;
mod lock;
mod memory;
mod sqlite;
mod traits;

pub use file::FileKeyValueStore;
pub use keys::StorageKeys;
pub use memory::MemoryKeyValueStore;
pub use sqlite::SqliteKeyValueStore;
pub use traits::KeyValueStore;

use outbox_config_and_utils::{Config, Paths, StorageBackend};
use std::path::PathBuf;
use thiserror::Error;

/// Error type for storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Backend-specific failure (poisoned lock, invalid key, ...)
    #[error("Storage backend error: {0}")]
    Backend(String),

    /// SQLite error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Encoding/decoding error
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Another handle, usually another process, owns the store
    #[error("Store is in use by another outbox (lock {})", .0.display())]
    Locked(PathBuf),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Open the store selected by `config.storage_backend` under `paths`.
pub fn create_store(config: &Config, paths: &Paths) -> StorageResult<Box<dyn KeyValueStore>> {
    match config.storage_backend {
        StorageBackend::File => Ok(Box::new(FileKeyValueStore::open(paths.store_dir())?)),
        StorageBackend::Sqlite => Ok(Box::new(SqliteKeyValueStore::open(
            &paths.database_file(),
        )?)),
    }
}
