//! Trigger inputs: GPIO edge sources feeding the trigger sensors.
//!
//! Current edge sources:
//! - `sysfs`: Linux sysfs GPIO, falling-edge interrupts through `poll(2)`
//! - `simulation`: in-process triggers for development and tests

pub mod simulation;
pub mod sysfs;

pub use simulation::SimulatedTriggers;
pub use sysfs::SysfsGpio;

use crate::clock::Clock;
use crate::error::Result;
use crate::sensors::SensorBank;
use log::info;
use std::sync::Arc;

/// Callback invoked with the pin number on every falling edge.
///
/// Runs in the edge source's context (watcher thread or timer task), so it
/// must stay short and must not block.
pub type EdgeCallback = Arc<dyn Fn(u32) + Send + Sync>;

/// GPIO collaborator: delivers falling edges on registered pins.
pub trait EdgeSource {
    /// Register `callback` for falling edges on `pin`. One callback per pin.
    fn register_falling_edge(&mut self, pin: u32, callback: EdgeCallback) -> Result<()>;
}

/// Register one edge callback per sensor, routing edges to `capture()`.
pub fn attach_sensors(
    source: &mut dyn EdgeSource,
    sensors: Arc<SensorBank>,
    clock: Arc<dyn Clock>,
) -> Result<()> {
    for sensor in sensors.iter() {
        let bank = sensors.clone();
        let clock = clock.clone();
        let callback: EdgeCallback = Arc::new(move |pin: u32| {
            if let Some(sensor) = bank.by_pin(pin) {
                sensor.capture(clock.now_ms());
            }
        });
        source.register_falling_edge(sensor.pin(), callback)?;
        info!(
            "[GPIO] channel {} armed on pin {} (debounce {} ms)",
            sensor.channel_id(),
            sensor.pin(),
            sensor.debounce_window_ms()
        );
    }
    Ok(())
}
