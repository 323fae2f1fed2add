//! Liveness heartbeats to the master.

use crate::report::Reporter;
use log::{debug, warn};
use std::sync::Arc;

/// Last successful liveness report and the fixed interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeartbeatClock {
    interval_ms: u64,
    last_alive_ms: u64,
}

impl HeartbeatClock {
    pub fn new(interval_ms: u64, start_ms: u64) -> Self {
        Self {
            interval_ms,
            last_alive_ms: start_ms,
        }
    }

    pub fn interval_ms(&self) -> u64 {
        self.interval_ms
    }

    pub fn last_alive_ms(&self) -> u64 {
        self.last_alive_ms
    }

    /// True once more than one interval separates `now_ms` from the last
    /// success. Measured in either direction, so a clock stepped backwards
    /// past the last send does not silence the node.
    pub fn is_due(&self, now_ms: u64) -> bool {
        now_ms.abs_diff(self.last_alive_ms) > self.interval_ms
    }

    pub fn mark_sent(&mut self, now_ms: u64) {
        self.last_alive_ms = now_ms;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatOutcome {
    NotDue,
    Sent,
    /// Send failed; retried on the next pass.
    Failed,
}

pub struct HeartbeatScheduler {
    clock: HeartbeatClock,
    reporter: Arc<Reporter>,
}

impl HeartbeatScheduler {
    pub fn new(interval_ms: u64, start_ms: u64, reporter: Arc<Reporter>) -> Self {
        Self {
            clock: HeartbeatClock::new(interval_ms, start_ms),
            reporter,
        }
    }

    pub fn clock(&self) -> &HeartbeatClock {
        &self.clock
    }

    /// Send a heartbeat if the interval elapsed.
    ///
    /// Only a confirmed send moves the clock, so a failure is retried on the
    /// very next call instead of one interval later.
    pub async fn maybe_send_alive(&mut self, now_ms: u64) -> HeartbeatOutcome {
        if !self.clock.is_due(now_ms) {
            return HeartbeatOutcome::NotDue;
        }

        match self.reporter.send_alive().await {
            Ok(()) => {
                self.clock.mark_sent(now_ms);
                debug!("[Heartbeat] alive sent at {} ms", now_ms);
                HeartbeatOutcome::Sent
            }
            Err(e) => {
                warn!("[Heartbeat] alive not delivered: {}", e);
                HeartbeatOutcome::Failed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedTransport;

    fn scheduler(start_ms: u64) -> (Arc<ScriptedTransport>, HeartbeatScheduler) {
        let transport = Arc::new(ScriptedTransport::new());
        let reporter = Arc::new(Reporter::new(4, "http://master", transport.clone()));
        (transport, HeartbeatScheduler::new(5_000, start_ms, reporter))
    }

    #[test]
    fn test_clock_due() {
        let clock = HeartbeatClock::new(5_000, 1_000);
        assert!(!clock.is_due(1_000));
        assert!(!clock.is_due(6_000));
        assert!(clock.is_due(6_001));
        assert!(!clock.is_due(0));
    }

    #[tokio::test]
    async fn test_backward_clock_step_keeps_heartbeats() {
        // Started on an unsynced clock one hour ahead, then stepped back to 0
        let transport = Arc::new(ScriptedTransport::new());
        transport.set_fallback(Some(200));
        let reporter = Arc::new(Reporter::new(1, "http://master", transport.clone()));
        let mut hb = HeartbeatScheduler::new(5_000, 3_600_000, reporter);

        let mut sent = 0;
        for now in (0..600_000u64).step_by(10) {
            if hb.maybe_send_alive(now).await == HeartbeatOutcome::Sent {
                sent += 1;
            }
        }

        assert!(sent >= 100, "only {} heartbeats after the step", sent);
        assert_eq!(transport.requests().len(), sent);
        assert!(hb.clock().last_alive_ms() < 600_000);
    }

    #[tokio::test]
    async fn test_not_due_sends_nothing() {
        let (transport, mut hb) = scheduler(0);
        assert_eq!(hb.maybe_send_alive(4_999).await, HeartbeatOutcome::NotDue);
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_sent_advances_clock() {
        let (transport, mut hb) = scheduler(0);
        transport.set_fallback(Some(200));

        assert_eq!(hb.maybe_send_alive(5_001).await, HeartbeatOutcome::Sent);
        assert_eq!(hb.clock().last_alive_ms(), 5_001);
        assert_eq!(transport.requests_to("/alive")[0].body, r#"{"id":4}"#);

        // At most one successful send per window
        for now in (5_002..=10_001).step_by(100) {
            assert_eq!(hb.maybe_send_alive(now).await, HeartbeatOutcome::NotDue);
        }
        assert_eq!(transport.requests().len(), 1);
        assert_eq!(hb.maybe_send_alive(10_002).await, HeartbeatOutcome::Sent);
    }

    #[tokio::test]
    async fn test_failure_retries_next_pass() {
        let (transport, mut hb) = scheduler(0);
        transport.push_failure("unreachable");
        transport.push_status(404);
        transport.push_status(200);

        assert_eq!(hb.maybe_send_alive(6_000).await, HeartbeatOutcome::Failed);
        assert_eq!(hb.maybe_send_alive(6_010).await, HeartbeatOutcome::Failed);
        assert_eq!(hb.clock().last_alive_ms(), 0);
        assert_eq!(hb.maybe_send_alive(6_020).await, HeartbeatOutcome::Sent);
        assert_eq!(hb.clock().last_alive_ms(), 6_020);
        assert_eq!(transport.requests().len(), 3);
    }
}
