//! HTTP transport backed by `reqwest`.

use crate::{OutboxResult, RequestMethod, Transport, TransportError, TransportResponse};
use async_trait::async_trait;
use reqwest::{Client, Method};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;

/// Sender configuration.
#[derive(Debug, Clone)]
pub struct SenderConfig {
    /// Whole-request timeout. Expiry surfaces as [`TransportError::Timeout`].
    pub request_timeout: Duration,
    /// Value of the `User-Agent` header.
    pub user_agent: String,
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            user_agent: concat!("offline-outbox/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// [`Transport`] that issues real HTTP requests.
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(config: SenderConfig) -> OutboxResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(config.user_agent)
            .build()?;

        Ok(Self { client })
    }

    fn to_reqwest_method(method: RequestMethod) -> Method {
        match method {
            RequestMethod::Get => Method::GET,
            RequestMethod::Post => Method::POST,
            RequestMethod::Put => Method::PUT,
            RequestMethod::Patch => Method::PATCH,
            RequestMethod::Delete => Method::DELETE,
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(
        &self,
        address: &str,
        method: RequestMethod,
        headers: &BTreeMap<String, String>,
        body: Option<&Value>,
    ) -> Result<TransportResponse, TransportError> {
        debug!(address = %address, method = %method, "Sending request");

        let mut request = self
            .client
            .request(Self::to_reqwest_method(method), address);
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(map_reqwest_error)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(map_reqwest_error)?;

        debug!(address = %address, method = %method, status = status, "Response received");
        Ok(TransportResponse { status, body })
    }
}

fn map_reqwest_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout
    } else {
        TransportError::Network(err.to_string())
    }
}
