//! Logging initialization.
//!
//! Thin wrapper over the observability crate: JSONL goes to the log file under
//! the base directory and a compact copy goes to stderr.

use crate::Paths;

/// Service name stamped on every log line.
pub const SERVICE_NAME: &str = "offline-outbox";

/// Install the process-wide subscriber. `RUST_LOG` overrides `level`.
///
/// ```ignore
/// init_logging("info", &paths);
/// tracing::info!("outbox started");
/// ```
pub fn init_logging(level: &str, paths: &Paths) {
    observability::init_with_config(log_config(level, paths));
}

fn log_config(level: &str, paths: &Paths) -> observability::LogConfig {
    observability::LogConfig {
        service_name: SERVICE_NAME.into(),
        default_level: level.into(),
        log_path: Some(paths.log_file()),
        also_stderr: true,
    }
}
