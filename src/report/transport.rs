//! HTTP transport used by the reporter.

use crate::error::{NodeError, Result};
use async_trait::async_trait;
use std::time::Duration;

/// Blocking-style POST: one request in flight, status code out.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// POST a JSON `body` to `url` and return the HTTP status code.
    ///
    /// Timeouts and connection failures are `NodeError::Transport`.
    async fn post(&self, url: &str, body: String) -> Result<u16>;
}

/// `reqwest`-backed transport with a fixed per-request timeout.
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| NodeError::Transport(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn post(&self, url: &str, body: String) -> Result<u16> {
        let response = self
            .client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| NodeError::Transport(e.to_string()))?;
        Ok(response.status().as_u16())
    }
}
