//! Uptime clock adapters.
//!
//! - [`SystemClock`] wraps `std::time::Instant` for the simulator.
//! - [`ManualClock`] is set by hand; tests use it to land in a chosen
//!   cipher bucket.

use std::cell::Cell;
use std::time::Instant;

use crate::app::ports::ClockPort;

/// Monotonic uptime since construction.
pub struct SystemClock {
    start: Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl ClockPort for SystemClock {
    fn uptime_secs(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<f64>,
}

impl ManualClock {
    pub fn at(secs: f64) -> Self {
        Self {
            now: Cell::new(secs),
        }
    }

    pub fn set(&self, secs: f64) {
        self.now.set(secs);
    }

    pub fn advance(&self, secs: f64) {
        self.now.set(self.now.get() + secs);
    }
}

impl ClockPort for ManualClock {
    fn uptime_secs(&self) -> f64 {
        self.now.get()
    }
}
