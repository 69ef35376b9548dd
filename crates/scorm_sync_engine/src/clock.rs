//! Wall-clock source for element timestamps and batch id seeding.

use parking_lot::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

/// A source of wall-clock time.
pub trait Clock: Send + Sync {
    /// Returns seconds since the Unix epoch with sub-second precision.
    fn now_secs(&self) -> f64;

    /// Returns whole milliseconds since the Unix epoch.
    fn now_millis(&self) -> u64 {
        (self.now_secs() * 1000.0).max(0.0) as u64
    }
}

/// The system clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_secs(&self) -> f64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs_f64()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<f64>,
}

impl ManualClock {
    /// Creates a clock reading `start` seconds.
    pub fn new(start: f64) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Sets the current time.
    pub fn set(&self, secs: f64) {
        *self.now.lock() = secs;
    }

    /// Moves the clock forward.
    pub fn advance(&self, secs: f64) {
        *self.now.lock() += secs;
    }
}

impl Clock for ManualClock {
    fn now_secs(&self) -> f64 {
        *self.now.lock()
    }
}
