use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use thiserror::Error;
use tracing::{debug, warn};

pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Connection options for the inverter's local HTTP API.
#[cfg_attr(feature = "config", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Whole-request timeout in milliseconds, including reading the body.
    pub timeout_ms: u64,
    pub connect_timeout_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 5_000,
            connect_timeout_ms: 2_000,
        }
    }
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid request header {0}")]
    InvalidHeader(String),
    #[error("request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
    #[error("http status {status}")]
    Status { status: u16 },
    #[error("http transport error: {0}")]
    Http(#[from] reqwest::Error),
}

/// A single-shot "POST a body, read the bytes back" capability.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn post(
        &self,
        url: &str,
        headers: &[(String, String)],
        body: &str,
    ) -> Result<Vec<u8>, TransportError>;
}

#[derive(Debug, Clone)]
pub struct HttpClient {
    config: ClientConfig,
    client: reqwest::Client,
}

impl HttpClient {
    pub fn new(config: ClientConfig) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .build()?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

#[async_trait]
impl Transport for HttpClient {
    async fn post(
        &self,
        url: &str,
        headers: &[(String, String)],
        body: &str,
    ) -> Result<Vec<u8>, TransportError> {
        let headers = build_headers(headers)?;
        let result = self
            .client
            .post(url)
            .headers(headers)
            .body(body.to_string())
            .send()
            .await;

        let response = match result {
            Ok(response) => response,
            Err(err) if err.is_timeout() => {
                warn!(url, timeout_ms = self.config.timeout_ms, "http request timeout");
                return Err(TransportError::Timeout {
                    timeout_ms: self.config.timeout_ms,
                });
            }
            Err(err) => {
                warn!(url, error = %err, "http request failed");
                return Err(TransportError::Http(err));
            }
        };

        let status = response.status();
        if !status.is_success() {
            warn!(url, status = status.as_u16(), "http request rejected");
            return Err(TransportError::Status {
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().await.map_err(|err| {
            if err.is_timeout() {
                TransportError::Timeout {
                    timeout_ms: self.config.timeout_ms,
                }
            } else {
                TransportError::Http(err)
            }
        })?;
        debug!(url, len = bytes.len(), "http response read");
        Ok(bytes.to_vec())
    }
}

/// Caller headers win over the default form content type.
pub fn build_headers(headers: &[(String, String)]) -> Result<HeaderMap, TransportError> {
    let mut map = HeaderMap::new();
    map.insert(CONTENT_TYPE, HeaderValue::from_static(FORM_CONTENT_TYPE));
    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| TransportError::InvalidHeader(name.clone()))?;
        let value =
            HeaderValue::from_str(value).map_err(|_| TransportError::InvalidHeader(name.to_string()))?;
        map.insert(name, value);
    }
    Ok(map)
}
