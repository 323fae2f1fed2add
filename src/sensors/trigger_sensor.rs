//! Debounced trigger input (e.g. a photoelectric finish-line beam).
//!
//! A trigger sensor holds at most one captured, undelivered event. Edge
//! callbacks call [`TriggerSensor::capture`] and the main loop drains the
//! event with [`TriggerSensor::poll`] / [`TriggerSensor::acknowledge`].
//!
//! All state lives in atomics so the capture path never blocks or
//! allocates. The state byte is the only synchronization point: the
//! timestamp is written before the byte is released as `PENDING`, and the
//! main loop only touches the timestamp after observing `PENDING`.

use std::sync::atomic::{AtomicU8, AtomicU32, AtomicU64, Ordering};

const IDLE: u8 = 0;
const CAPTURING: u8 = 1;
const PENDING: u8 = 2;

/// No trigger has been accepted yet.
const NO_REFERENCE: u64 = u64::MAX;

/// Observable state of a trigger sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorState {
    /// No undelivered event.
    Idle,
    /// An event captured at `time_ms` is waiting for delivery.
    Pending { time_ms: u64 },
}

/// One physical trigger input with time-based debounce.
///
/// # Example
/// ```ignore
/// let sensor = TriggerSensor::new(1, 13, 1000);
///
/// // From the edge callback
/// sensor.capture(clock.now_ms());
///
/// // From the main loop
/// if let Some(time_ms) = sensor.poll() {
///     if reporter.send_event(sensor.channel_id(), time_ms).await.is_ok() {
///         sensor.acknowledge();
///     }
/// }
/// ```
#[derive(Debug)]
pub struct TriggerSensor {
    channel_id: u32,
    pin: u32,
    debounce_window_ms: u64,
    state: AtomicU8,
    pending_time: AtomicU64,
    /// Timestamp of the last accepted trigger, the debounce reference point.
    last_accepted: AtomicU64,
    suppressed: AtomicU32,
}

impl TriggerSensor {
    /// Create an idle sensor reporting as `channel_id`, wired to `pin`.
    pub fn new(channel_id: u32, pin: u32, debounce_window_ms: u64) -> Self {
        Self {
            channel_id,
            pin,
            debounce_window_ms,
            state: AtomicU8::new(IDLE),
            pending_time: AtomicU64::new(0),
            last_accepted: AtomicU64::new(NO_REFERENCE),
            suppressed: AtomicU32::new(0),
        }
    }

    pub fn channel_id(&self) -> u32 {
        self.channel_id
    }

    pub fn pin(&self) -> u32 {
        self.pin
    }

    pub fn debounce_window_ms(&self) -> u64 {
        self.debounce_window_ms
    }

    /// Record a trigger seen at `now_ms`.
    ///
    /// Accepted only when the sensor is idle and at least the debounce
    /// window has passed since the last accepted trigger. Returns whether
    /// the trigger was accepted. Safe to call from an edge callback.
    pub fn capture(&self, now_ms: u64) -> bool {
        if self
            .state
            .compare_exchange(IDLE, CAPTURING, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            self.suppressed.fetch_add(1, Ordering::Relaxed);
            return false;
        }

        let reference = self.last_accepted.load(Ordering::Relaxed);
        // abs_diff: a clock stepped backwards by time sync must not lock the channel
        if reference != NO_REFERENCE && now_ms.abs_diff(reference) < self.debounce_window_ms {
            self.state.store(IDLE, Ordering::Release);
            self.suppressed.fetch_add(1, Ordering::Relaxed);
            return false;
        }

        self.pending_time.store(now_ms, Ordering::Relaxed);
        self.last_accepted.store(now_ms, Ordering::Relaxed);
        self.state.store(PENDING, Ordering::Release);
        true
    }

    /// Timestamp of the pending event, if any. Does not change state.
    pub fn poll(&self) -> Option<u64> {
        if self.state.load(Ordering::Acquire) == PENDING {
            Some(self.pending_time.load(Ordering::Relaxed))
        } else {
            None
        }
    }

    /// Mark the pending event as delivered.
    ///
    /// The delivered capture timestamp stays the debounce reference, so a
    /// slow delivery never extends the window. No-op when nothing is
    /// pending. Returns whether an event was acknowledged.
    pub fn acknowledge(&self) -> bool {
        if self.state.load(Ordering::Acquire) != PENDING {
            return false;
        }
        let delivered = self.pending_time.load(Ordering::Relaxed);
        self.last_accepted.store(delivered, Ordering::Relaxed);
        self.state
            .compare_exchange(PENDING, IDLE, Ordering::AcqRel, Ordering::Relaxed)
            .is_ok()
    }

    pub fn state(&self) -> SensorState {
        match self.poll() {
            Some(time_ms) => SensorState::Pending { time_ms },
            None => SensorState::Idle,
        }
    }

    /// Whether the last accepted event (if any) has been delivered.
    pub fn is_acknowledged(&self) -> bool {
        self.poll().is_none()
    }

    /// Number of triggers rejected since the last call, then reset to zero.
    pub fn take_suppressed(&self) -> u32 {
        self.suppressed.swap(0, Ordering::Relaxed)
    }
}
