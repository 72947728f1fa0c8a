//! Core configuration and utilities for the offline outbox.

mod config;
mod error;
mod logging;
mod paths;

pub use config::{Config, StorageBackend, DEFAULT_LOG_LEVEL, DEFAULT_QUEUE_STORAGE_KEY};
pub use error::{CoreError, CoreResult};
pub use logging::{init_logging, SERVICE_NAME};
pub use paths::Paths;
