//! Simulated trigger edges for development and testing.
//!
//! Edges can be fired on demand with [`SimulatedTriggers::fire`] or by a
//! background task that picks a random registered pin at a jittered interval.

use super::{EdgeCallback, EdgeSource};
use crate::error::{NodeError, Result};
use log::info;
use parking_lot::Mutex;
use rand::Rng;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{Duration, sleep};

#[derive(Clone, Default)]
pub struct SimulatedTriggers {
    callbacks: Arc<Mutex<Vec<(u32, EdgeCallback)>>>,
}

impl SimulatedTriggers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registered pins in registration order.
    pub fn pins(&self) -> Vec<u32> {
        self.callbacks.lock().iter().map(|(pin, _)| *pin).collect()
    }

    /// Fire a falling edge on `pin`. Returns false if nothing is registered there.
    pub fn fire(&self, pin: u32) -> bool {
        let callback = self
            .callbacks
            .lock()
            .iter()
            .find(|(p, _)| *p == pin)
            .map(|(_, cb)| cb.clone());
        match callback {
            Some(callback) => {
                callback(pin);
                true
            }
            None => false,
        }
    }

    /// Spawn a task firing a random registered pin every `mean_interval` ±50%.
    pub fn spawn(&self, mean_interval: Duration) -> JoinHandle<()> {
        let sim = self.clone();
        let mean_ms = mean_interval.as_millis().max(2) as u64;
        tokio::spawn(async move {
            loop {
                let (delay_ms, choice) = {
                    let mut rng = rand::thread_rng();
                    (rng.gen_range(mean_ms / 2..=mean_ms * 3 / 2), rng.r#gen::<usize>())
                };
                sleep(Duration::from_millis(delay_ms)).await;

                let pins = sim.pins();
                if pins.is_empty() {
                    continue;
                }
                let pin = pins[choice % pins.len()];
                info!("[Sim] trigger on pin {}", pin);
                sim.fire(pin);
            }
        })
    }
}

impl EdgeSource for SimulatedTriggers {
    fn register_falling_edge(&mut self, pin: u32, callback: EdgeCallback) -> Result<()> {
        let mut callbacks = self.callbacks.lock();
        if callbacks.iter().any(|(p, _)| *p == pin) {
            return Err(NodeError::Gpio {
                pin,
                message: "edge callback already registered".into(),
            });
        }
        callbacks.push((pin, callback));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio_test::assert_err;

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut sim = SimulatedTriggers::new();
        sim.register_falling_edge(13, Arc::new(|_: u32| {})).unwrap();
        assert_err!(sim.register_falling_edge(13, Arc::new(|_: u32| {})));
        assert_eq!(sim.pins(), vec![13]);
    }

    #[test]
    fn test_fire_passes_pin() {
        let seen = Arc::new(AtomicU32::new(0));
        let mut sim = SimulatedTriggers::new();
        let seen_cb = seen.clone();
        sim.register_falling_edge(21, Arc::new(move |pin: u32| seen_cb.store(pin, Ordering::SeqCst)))
            .unwrap();
        assert!(sim.fire(21));
        assert_eq!(seen.load(Ordering::SeqCst), 21);
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawned_task_fires() {
        let count = Arc::new(AtomicU32::new(0));
        let mut sim = SimulatedTriggers::new();
        let count_cb = count.clone();
        sim.register_falling_edge(5, Arc::new(move |_: u32| {
            count_cb.fetch_add(1, Ordering::SeqCst);
        }))
        .unwrap();

        let task = sim.spawn(Duration::from_millis(100));
        sleep(Duration::from_secs(2)).await;
        task.abort();
        assert!(count.load(Ordering::SeqCst) >= 10);
    }
}
