//! Transport seam consumed by the dispatcher.

use crate::RequestMethod;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

/// Response as seen by the dispatcher: a status code and the raw body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_not_found(&self) -> bool {
        self.status == 404
    }
}

/// Failure to get any response at all.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out")]
    Timeout,
}

/// Issues one request and reports the status. Non-2xx is not an error here;
/// the caller interprets status codes.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(
        &self,
        address: &str,
        method: RequestMethod,
        headers: &BTreeMap<String, String>,
        body: Option<&Value>,
    ) -> Result<TransportResponse, TransportError>;
}
