//! Reporting client: formats reports and POSTs them to the master.
//!
//! The reporter makes exactly one attempt per call. Retrying is left to the
//! dispatcher and heartbeat scheduler, which keep the data to resend.

use super::messages::{AliveReport, Endpoint, EventReport};
use super::transport::HttpTransport;
use crate::config::normalize_base_url;
use crate::error::{NodeError, Result};
use serde::Serialize;
use std::sync::Arc;

/// HTTP status the master answers with on success.
const STATUS_OK: u16 = 200;

pub struct Reporter {
    node_id: u32,
    base_url: String,
    transport: Arc<dyn HttpTransport>,
}

impl Reporter {
    pub fn new(node_id: u32, base_url: &str, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            node_id,
            base_url: normalize_base_url(base_url),
            transport,
        }
    }

    pub fn node_id(&self) -> u32 {
        self.node_id
    }

    pub fn url(&self, endpoint: Endpoint) -> String {
        format!("{}{}", self.base_url, endpoint.path())
    }

    /// Report a trigger on `channel_id` captured at `time_ms`.
    pub async fn send_event(&self, channel_id: u32, time_ms: u64) -> Result<()> {
        let report = EventReport {
            id: self.node_id,
            sensor: channel_id,
            time_ms,
        };
        self.post(Endpoint::Event, &report).await
    }

    /// Report that the node is alive.
    pub async fn send_alive(&self) -> Result<()> {
        self.post(Endpoint::Alive, &AliveReport { id: self.node_id })
            .await
    }

    /// `Ok` only for HTTP 200. Any other status or transport failure is an error.
    async fn post<T: Serialize + Sync>(&self, endpoint: Endpoint, report: &T) -> Result<()> {
        let body = serde_json::to_string(report)?;
        let url = self.url(endpoint);
        log::debug!("POST {} {}", url, body);

        match self.transport.post(&url, body).await? {
            STATUS_OK => Ok(()),
            status => Err(NodeError::UnexpectedStatus(status)),
        }
    }
}
