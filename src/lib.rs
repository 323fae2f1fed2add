//! Race timer edge node library.
//!
//! This library provides the event-capture-and-delivery pipeline of a
//! race-timing sensor node: debounced trigger sensors, the dispatcher that
//! reports captured events to the timing master, the connectivity
//! supervisor and the liveness heartbeat.

pub mod clock;
pub mod config;
pub mod connectivity;
pub mod dispatch;
pub mod error;
pub mod heartbeat;
pub mod input;
pub mod node;
pub mod report;
pub mod sensors;

#[cfg(test)]
mod testing;
