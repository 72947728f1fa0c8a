//! Dev-mode logging configuration.
//!
//! Writes structured JSONL logs to a central file that can be tailed
//! by external tools. Multi-process safe via append-only semantics.

use crate::json_layer::JsonLayer;
use crate::LogConfig;
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Central log file location for all dev services.
/// Uses `~/.offline-outbox/logs/dev.jsonl`, or the temp dir when there is
/// no home directory.
fn default_log_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(".offline-outbox")
        .join("logs")
        .join("dev.jsonl")
}

/// File writer that appends to the central log file.
/// Flushes every line for multi-process safety.
#[derive(Clone)]
pub struct CentralLogWriter {
    inner: Arc<Mutex<BufWriter<File>>>,
}

impl CentralLogWriter {
    pub fn new(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            inner: Arc::new(Mutex::new(BufWriter::with_capacity(8192, file))),
        })
    }
}

impl io::Write for CentralLogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut guard = self.inner.lock();
        let result = guard.write(buf);
        // Each log line must be visible to other processes tailing the file.
        guard.flush()?;
        result
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.lock().flush()
    }
}

impl<'a> MakeWriter<'a> for CentralLogWriter {
    type Writer = CentralLogWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

fn env_filter_or(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Initialize the dev subscriber with central JSONL file output.
///
/// If the log file cannot be opened the subscriber falls back to stderr only.
pub fn init_dev_subscriber(config: &LogConfig) {
    let log_path = config.log_path.clone().unwrap_or_else(default_log_path);

    let (json_layer, open_error) = match CentralLogWriter::new(&log_path) {
        Ok(writer) => (
            Some(JsonLayer::new(config.service_name.clone(), writer)),
            None,
        ),
        Err(e) => (None, Some(e)),
    };

    let stderr_layer = if config.also_stderr || json_layer.is_none() {
        Some(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_file(false)
                .with_line_number(false)
                .compact()
                .with_writer(io::stderr)
                .with_ansi(true),
        )
    } else {
        None
    };

    let installed = tracing_subscriber::registry()
        .with(json_layer.map(|l| l.with_filter(env_filter_or(&config.default_level))))
        .with(stderr_layer.map(|l| l.with_filter(env_filter_or(&config.default_level))))
        .try_init()
        .is_ok();

    if !installed {
        return;
    }

    match open_error {
        None => tracing::info!(log_path = %log_path.display(), "observability initialized"),
        Some(e) => tracing::warn!(
            log_path = %log_path.display(),
            error = %e,
            "central log file unavailable, logging to stderr only"
        ),
    }
}
