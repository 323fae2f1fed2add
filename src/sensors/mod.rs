//! Trigger sensors and their fixed-order collection.
//!
//! Sensors are created once at startup from configuration and shared
//! between the edge callbacks (capture) and the main loop (poll/acknowledge).

pub mod trigger_sensor;

pub use trigger_sensor::{SensorState, TriggerSensor};

use crate::config::SensorConfig;
use std::sync::Arc;

/// All sensors of the node in configuration order.
///
/// The order is the dispatch order and never changes after construction.
#[derive(Debug, Default)]
pub struct SensorBank {
    sensors: Vec<Arc<TriggerSensor>>,
}

impl SensorBank {
    pub fn new(sensors: Vec<TriggerSensor>) -> Self {
        Self {
            sensors: sensors.into_iter().map(Arc::new).collect(),
        }
    }

    pub fn from_config(configs: &[SensorConfig]) -> Self {
        Self::new(
            configs
                .iter()
                .map(|c| TriggerSensor::new(c.channel_id, c.pin, c.debounce_ms))
                .collect(),
        )
    }

    /// Sensor wired to `pin`. Linear scan, no allocation.
    pub fn by_pin(&self, pin: u32) -> Option<&Arc<TriggerSensor>> {
        self.sensors.iter().find(|s| s.pin() == pin)
    }

    pub fn by_channel(&self, channel_id: u32) -> Option<&Arc<TriggerSensor>> {
        self.sensors.iter().find(|s| s.channel_id() == channel_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<TriggerSensor>> {
        self.sensors.iter()
    }

    pub fn pins(&self) -> Vec<u32> {
        self.sensors.iter().map(|s| s.pin()).collect()
    }

    pub fn len(&self) -> usize {
        self.sensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sensors.is_empty()
    }
}
