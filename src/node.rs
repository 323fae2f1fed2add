//! The race-timer node main loop.
//!
//! One cooperative loop on the runtime: connectivity check, then event
//! dispatch, then heartbeat, then a short sleep. Edge callbacks run
//! concurrently and only touch sensor state.

use crate::clock::Clock;
use crate::connectivity::{ConnectivitySupervisor, LinkPhase};
use crate::dispatch::{DispatchSummary, EventDispatcher};
use crate::heartbeat::{HeartbeatOutcome, HeartbeatScheduler};
use crate::report::Reporter;
use crate::sensors::SensorBank;
use log::info;
use std::sync::Arc;
use std::time::Duration;

/// Result of a single loop pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassReport {
    pub link: LinkPhase,
    pub dispatch: DispatchSummary,
    pub heartbeat: HeartbeatOutcome,
}

pub struct RaceNode {
    clock: Arc<dyn Clock>,
    supervisor: ConnectivitySupervisor,
    dispatcher: EventDispatcher,
    heartbeat: HeartbeatScheduler,
    loop_sleep: Duration,
}

impl RaceNode {
    pub fn new(
        clock: Arc<dyn Clock>,
        sensors: Arc<SensorBank>,
        reporter: Arc<Reporter>,
        supervisor: ConnectivitySupervisor,
        heartbeat_interval_ms: u64,
        loop_sleep: Duration,
    ) -> Self {
        let heartbeat = HeartbeatScheduler::new(heartbeat_interval_ms, clock.now_ms(), reporter.clone());
        Self {
            dispatcher: EventDispatcher::new(sensors, reporter),
            clock,
            supervisor,
            heartbeat,
            loop_sleep,
        }
    }

    pub fn supervisor(&self) -> &ConnectivitySupervisor {
        &self.supervisor
    }

    /// One loop pass. Link first, so a just-restored link carries this pass's events.
    pub async fn run_once(&mut self) -> PassReport {
        let link = self.supervisor.ensure_connected().await;
        let dispatch = self.dispatcher.dispatch().await;
        let heartbeat = self.heartbeat.maybe_send_alive(self.clock.now_ms()).await;
        PassReport {
            link,
            dispatch,
            heartbeat,
        }
    }

    /// Run forever. The process is stopped from outside.
    pub async fn run(mut self) {
        info!(
            "Race node loop started (sleep {:?}, heartbeat every {} ms)",
            self.loop_sleep,
            self.heartbeat.clock().interval_ms()
        );
        loop {
            self.run_once().await;
            tokio::time::sleep(self.loop_sleep).await;
        }
    }
}
