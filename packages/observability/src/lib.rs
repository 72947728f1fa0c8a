//! Structured logging for the offline outbox workspace.
//!
//! Library crates only emit `tracing` events with structured fields; the
//! binary installs the subscriber once through [`init_with_config`].
//!
//! With the `dev` feature (default) each event is appended as one JSON line
//! to a shared file, `~/.offline-outbox/logs/dev.jsonl` unless
//! [`LogConfig::log_path`] says otherwise, so several processes can be
//! followed with `tail -f ... | jq`. Without it, events go to stderr.

#[cfg(feature = "dev")]
mod dev;

mod json_layer;

pub use json_layer::LogEntry;

use std::path::PathBuf;

/// Subscriber settings.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Written into the `service` field of every line.
    pub service_name: String,
    /// Filter used when `RUST_LOG` is unset.
    pub default_level: String,
    /// JSONL destination; `None` uses the central dev file.
    pub log_path: Option<PathBuf>,
    /// Mirror events to stderr in compact form.
    pub also_stderr: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            service_name: "offline-outbox".into(),
            default_level: "info".into(),
            log_path: None,
            also_stderr: false,
        }
    }
}

/// Install the global subscriber. Only the first call in a process has an
/// effect.
pub fn init_with_config(config: LogConfig) {
    #[cfg(feature = "dev")]
    dev::init_dev_subscriber(&config);

    #[cfg(not(feature = "dev"))]
    {
        use tracing_subscriber::util::SubscriberInitExt;
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.default_level));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .compact()
            .finish()
            .try_init();
    }
}
