//! File system paths for the offline outbox.

use crate::{CoreError, CoreResult};
use std::path::PathBuf;

/// Directory name under the home directory.
const BASE_DIR_NAME: &str = ".offline-outbox";

/// Manages file system paths for the outbox.
#[derive(Debug, Clone)]
pub struct Paths {
    /// Base directory for all outbox files (~/.offline-outbox)
    base_dir: PathBuf,
}

impl Paths {
    /// Create a new Paths instance rooted at `~/.offline-outbox`.
    pub fn new() -> CoreResult<Self> {
        let home = dirs::home_dir()
            .ok_or_else(|| CoreError::Path("Could not determine home directory".to_string()))?;

        Ok(Self {
            base_dir: home.join(BASE_DIR_NAME),
        })
    }

    /// Create a new Paths instance with a custom base directory.
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Get the base directory (~/.offline-outbox).
    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }

    /// Get the config file path (~/.offline-outbox/config.json).
    pub fn config_file(&self) -> PathBuf {
        self.base_dir.join("config.json")
    }

    /// Directory used by the file-backed key-value store (~/.offline-outbox/store).
    pub fn store_dir(&self) -> PathBuf {
        self.base_dir.join("store")
    }

    /// SQLite database used by the sqlite key-value store (~/.offline-outbox/outbox.sqlite).
    pub fn database_file(&self) -> PathBuf {
        self.base_dir.join("outbox.sqlite")
    }

    /// Get the logs directory (~/.offline-outbox/logs).
    pub fn logs_dir(&self) -> PathBuf {
        self.base_dir.join("logs")
    }

    /// Central JSONL log file (~/.offline-outbox/logs/dev.jsonl).
    pub fn log_file(&self) -> PathBuf {
        self.logs_dir().join("dev.jsonl")
    }

    /// Ensure all required directories exist.
    pub fn ensure_dirs(&self) -> CoreResult<()> {
        std::fs::create_dir_all(&self.base_dir)?;
        std::fs::create_dir_all(self.store_dir())?;
        std::fs::create_dir_all(self.logs_dir())?;
        Ok(())
    }
}
