//! Reports to the timing master over HTTP.
//!
//! - `messages`: JSON bodies and endpoint paths
//! - `transport`: the HTTP POST seam and its `reqwest` implementation
//! - `client`: the [`Reporter`] used by the dispatcher and heartbeat

mod client;
mod messages;
mod transport;

pub use client::Reporter;
pub use messages::{AliveReport, Endpoint, EventReport};
pub use transport::{HttpTransport, ReqwestTransport};
