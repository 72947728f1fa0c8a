//! Configuration management for the offline outbox.

use crate::{CoreError, CoreResult, Paths};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Storage key the pending queue is persisted under.
pub const DEFAULT_QUEUE_STORAGE_KEY: &str = "offlineRequests";

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_PROBE_ADDR: &str = "1.1.1.1:443";
const DEFAULT_POLL_INTERVAL_MS: u64 = 2_000;

/// Which persistent store backs the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// One JSON file per key under the store directory.
    File,
    /// A key-value table in a local SQLite database.
    Sqlite,
}

impl Default for StorageBackend {
    fn default() -> Self {
        Self::File
    }
}

/// Main outbox configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
    /// Persistent store backing the queue.
    #[serde(default)]
    pub storage_backend: StorageBackend,
    /// Key under which the queue is persisted.
    #[serde(default = "default_queue_storage_key")]
    pub queue_storage_key: String,
    /// Per-request timeout applied by the HTTP transport.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// `host:port` dialed to decide whether the network is reachable.
    #[serde(default = "default_probe_addr")]
    pub reachability_probe_addr: String,
    /// How often the reachability poller dials the probe address.
    #[serde(default = "default_poll_interval_ms")]
    pub reachability_poll_interval_ms: u64,
    /// Base URL that relative request targets are resolved against.
    #[serde(default)]
    pub api_base_url: Option<String>,
}

fn default_queue_storage_key() -> String {
    DEFAULT_QUEUE_STORAGE_KEY.to_string()
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_probe_addr() -> String {
    DEFAULT_PROBE_ADDR.to_string()
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            storage_backend: StorageBackend::default(),
            queue_storage_key: default_queue_storage_key(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            reachability_probe_addr: default_probe_addr(),
            reachability_poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            api_base_url: None,
        }
    }
}

impl Config {
    /// Create a new Config with default values, then override from environment.
    pub fn new() -> Self {
        let mut config = Self::default();
        config.load_from_env();
        config
    }

    /// Load configuration from the config file, falling back to defaults,
    /// then apply environment overrides.
    pub fn load(paths: &Paths) -> CoreResult<Self> {
        let config_path = paths.config_file();

        let mut config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            Self::default()
        };

        config.load_from_env();
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a file.
    pub fn save(&self, paths: &Paths) -> CoreResult<()> {
        paths.ensure_dirs()?;
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(paths.config_file(), content)?;
        Ok(())
    }

    fn load_from_env(&mut self) {
        if let Ok(log_level) = std::env::var("OFFLINE_OUTBOX_LOG_LEVEL") {
            self.log_level = log_level;
        }
        if let Ok(addr) = std::env::var("OFFLINE_OUTBOX_PROBE_ADDR") {
            self.reachability_probe_addr = addr;
        }
    }

    /// Reject values that would make the outbox unusable.
    pub fn validate(&self) -> CoreResult<()> {
        if self.queue_storage_key.trim().is_empty() {
            return Err(CoreError::Config(
                "queue_storage_key must not be empty".to_string(),
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(CoreError::Config(
                "request_timeout_secs must be positive".to_string(),
            ));
        }
        if self.reachability_poll_interval_ms == 0 {
            return Err(CoreError::Config(
                "reachability_poll_interval_ms must be positive".to_string(),
            ));
        }
        match self.reachability_probe_addr.rsplit_once(':') {
            Some((host, port)) if !host.is_empty() && port.parse::<u16>().is_ok() => {}
            _ => {
                return Err(CoreError::Config(format!(
                    "reachability_probe_addr must be host:port, got {:?}",
                    self.reachability_probe_addr
                )))
            }
        }
        if let Some(base) = &self.api_base_url {
            Url::parse(base)?;
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn reachability_poll_interval(&self) -> Duration {
        Duration::from_millis(self.reachability_poll_interval_ms)
    }

    /// Resolve a request target to an absolute URL.
    ///
    /// Absolute targets are returned as-is; relative ones are joined onto
    /// `api_base_url`.
    pub fn resolve_target(&self, target: &str) -> CoreResult<Url> {
        match Url::parse(target) {
            Ok(url) => Ok(url),
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                let base = self.api_base_url.as_deref().ok_or_else(|| {
                    CoreError::Config(format!(
                        "relative target {:?} needs api_base_url to be set",
                        target
                    ))
                })?;
                Ok(Url::parse(base)?.join(target)?)
            }
            Err(e) => Err(e.into()),
        }
    }
}
