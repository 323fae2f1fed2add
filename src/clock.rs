//! Wall-clock sources for trigger timestamps.
//!
//! Timestamps reported to the master are milliseconds since
//! 2000-01-01T00:00:00Z. Reads must stay lock-free because they happen
//! inside GPIO edge callbacks.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

/// 2000-01-01T00:00:00Z expressed in Unix milliseconds.
pub const EPOCH_2000_UNIX_MS: i64 = 946_684_800_000;

/// A millisecond clock shared between the main loop and edge callbacks.
pub trait Clock: Send + Sync {
    /// Milliseconds since the node epoch.
    fn now_ms(&self) -> u64;
}

/// Host wall clock corrected by the offset learned from time sync.
#[derive(Debug, Default)]
pub struct SystemClock {
    offset_ms: AtomicI64,
}

impl SystemClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uncorrected host time in Unix milliseconds.
    pub fn local_unix_ms() -> i64 {
        chrono::Utc::now().timestamp_millis()
    }

    /// Current correction applied on top of the host clock.
    pub fn offset_ms(&self) -> i64 {
        self.offset_ms.load(Ordering::Relaxed)
    }

    /// Replace the correction. Called after a successful time sync.
    pub fn set_offset_ms(&self, offset_ms: i64) {
        let old = self.offset_ms.swap(offset_ms, Ordering::Relaxed);
        if old != offset_ms {
            log::debug!("[Clock] offset changed from {} ms to {} ms", old, offset_ms);
        }
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        let corrected = Self::local_unix_ms() + self.offset_ms() - EPOCH_2000_UNIX_MS;
        corrected.max(0) as u64
    }
}

/// Clock that only moves when told to. Used by simulations and tests.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        Self {
            now: AtomicU64::new(start_ms),
        }
    }

    pub fn set(&self, now_ms: u64) {
        self.now.store(now_ms, Ordering::SeqCst);
    }

    pub fn advance(&self, delta_ms: u64) -> u64 {
        self.now.fetch_add(delta_ms, Ordering::SeqCst) + delta_ms
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}
