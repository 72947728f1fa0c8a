//! Exclusive ownership of an on-disk store.
//!
//! Every outbox keeps the whole queue in memory and rewrites the stored copy
//! on each change, so two processes sharing a store would overwrite each
//! other. Opening a store takes an advisory lock that is held until the store
//! is dropped.

use crate::{StorageError, StorageResult};
use fs2::FileExt;
use std::fs::{self, File};
use std::io;
use std::path::PathBuf;
use tracing::debug;

/// Held for the lifetime of an open store. Dropping it releases the lock.
#[derive(Debug)]
pub struct StoreLock {
    _file: File,
}

impl StoreLock {
    /// Take the lock at `path`, failing with [`StorageError::Locked`] if
    /// another handle already holds it.
    pub fn acquire(path: impl Into<PathBuf>) -> StorageResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = fs::OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)?;

        match FileExt::try_lock_exclusive(&file) {
            Ok(()) => {
                debug!(path = %path.display(), "Store lock acquired");
                Ok(Self { _file: file })
            }
            Err(e) if is_contended(&e) => Err(StorageError::Locked(path)),
            Err(e) => Err(e.into()),
        }
    }
}

fn is_contended(e: &io::Error) -> bool {
    e.kind() == io::ErrorKind::WouldBlock
        || e.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}
