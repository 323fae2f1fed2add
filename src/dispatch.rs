//! Event dispatcher: drains pending trigger events to the master.
//!
//! Sensors are visited in bank order. A pending event is acknowledged only
//! after the master confirmed it; on failure the sensor keeps the event and
//! the same timestamp is resent on the next pass.

use crate::report::Reporter;
use crate::sensors::SensorBank;
use log::{info, warn};
use std::sync::Arc;

/// Outcome of one dispatch pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    pub delivered: usize,
    pub failed: usize,
}

impl DispatchSummary {
    pub fn attempted(&self) -> usize {
        self.delivered + self.failed
    }
}

pub struct EventDispatcher {
    sensors: Arc<SensorBank>,
    reporter: Arc<Reporter>,
}

impl EventDispatcher {
    pub fn new(sensors: Arc<SensorBank>, reporter: Arc<Reporter>) -> Self {
        Self { sensors, reporter }
    }

    /// One pass over all sensors. No I/O when nothing is pending.
    pub async fn dispatch(&self) -> DispatchSummary {
        let mut summary = DispatchSummary::default();

        for sensor in self.sensors.iter() {
            let suppressed = sensor.take_suppressed();
            if suppressed > 0 {
                warn!(
                    "[Sensor] channel {} ignored {} trigger(s) (debounce or undelivered event)",
                    sensor.channel_id(),
                    suppressed
                );
            }

            let Some(time_ms) = sensor.poll() else {
                continue;
            };

            match self.reporter.send_event(sensor.channel_id(), time_ms).await {
                Ok(()) => {
                    sensor.acknowledge();
                    summary.delivered += 1;
                    info!(
                        "[Dispatch] channel {} event at {} ms delivered",
                        sensor.channel_id(),
                        time_ms
                    );
                }
                Err(e) => {
                    summary.failed += 1;
                    warn!(
                        "[Dispatch] channel {} event at {} ms not delivered, will retry: {}",
                        sensor.channel_id(),
                        time_ms,
                        e
                    );
                }
            }
        }

        summary
    }
}
