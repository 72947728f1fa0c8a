//! Outbox error types.

use crate::TransportError;
use thiserror::Error;

/// Outbox error type.
#[derive(Error, Debug)]
pub enum OutboxError {
    /// Persistent store error
    #[error("Storage error: {0}")]
    Storage(#[from] outbox_storage::StorageError),

    /// Transport-level failure on the immediate-send path
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// The remote answered a direct (non-queued) request with a non-2xx status
    #[error("Request failed with HTTP {status}: {body}")]
    ImmediateSend {
        /// HTTP status code returned by the remote.
        status: u16,
        /// Response body, for diagnostics.
        body: String,
    },

    /// HTTP client construction error
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// Unknown request method name
    #[error("Unsupported request method: {0}")]
    InvalidMethod(String),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias using OutboxError.
pub type OutboxResult<T> = Result<T, OutboxError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn immediate_send_display() {
        let err = OutboxError::ImmediateSend {
            status: 409,
            body: "conflict".to_string(),
        };
        assert_eq!(err.to_string(), "Request failed with HTTP 409: conflict");
    }

    #[test]
    fn transport_error_converts() {
        let err: OutboxError = TransportError::Timeout.into();
        assert!(matches!(err, OutboxError::Transport(TransportError::Timeout)));
        assert!(err.to_string().starts_with("Transport error:"));
    }

    #[test]
    fn json_error_from_serde() {
        let serde_err = serde_json::from_str::<serde_json::Value>("{{{").unwrap_err();
        let err: OutboxError = serde_err.into();
        assert!(err.to_string().starts_with("JSON error:"));
    }
}
