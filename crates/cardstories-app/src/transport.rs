// Request/response transport for the game service.
//
// `Transport` is the seam the poller and the action client talk through;
// `HttpTransport` is the reqwest-backed implementation used by the binary.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use cardstories_core::config::Config;
use cardstories_core::protocol::QueryParams;
use cardstories_core::session::TransportFailure;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("request aborted")]
    Aborted,

    #[error("network error: {0}")]
    Network(String),

    #[error("unexpected HTTP status {0}")]
    Status(u16),

    #[error("undecodable response body: {0}")]
    Decode(String),
}

impl TransportError {
    pub fn failure(&self) -> TransportFailure {
        match self {
            TransportError::Aborted => TransportFailure::Aborted,
            _ => TransportFailure::Failed,
        }
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one request and return the decoded JSON body.
    async fn request(&self, params: QueryParams) -> Result<Value, TransportError>;
}

/// GET requests against the configured resource URL.
pub struct HttpTransport {
    http: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Network(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, TransportError> {
        Self::new(config.server.base_url.clone(), config.request_timeout())
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn request(&self, params: QueryParams) -> Result<Value, TransportError> {
        debug!(?params, "GET {}", self.base_url);
        let response = self
            .http
            .get(&self.base_url)
            .query(&params)
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| TransportError::Decode(e.to_string()))
    }
}
