//! Report bodies sent to the timing master.

use serde::Serialize;

/// Master endpoints relative to the configured base URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Event,
    Alive,
}

impl Endpoint {
    pub fn path(self) -> &'static str {
        match self {
            Endpoint::Event => "/event",
            Endpoint::Alive => "/alive",
        }
    }
}

/// A captured trigger: `{"id":1,"sensor":2,"time_ms":123}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventReport {
    pub id: u32,
    pub sensor: u32,
    pub time_ms: u64,
}

/// Liveness ping: `{"id":1}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AliveReport {
    pub id: u32,
}
