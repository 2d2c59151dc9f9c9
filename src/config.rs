//! Engine configuration parameters.
//!
//! [`EngineConfig`] holds every runtime knob with its default.
//! Only the push cadence ([`PushFrequency`]) survives a reboot; it is
//! stored as a postcard blob through the [`ConfigPort`](crate::app::ports::ConfigPort).
//! The MCU poll interval is runtime-only by contract.

use serde::{Deserialize, Serialize};

use crate::app::ports::ConfigError;
use crate::device::ModelTable;

/// Upper bound for either push interval (one day).
pub const MAX_PUSH_SECS: u32 = 86_400;

/// Push cadence persisted across reboots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushFrequency {
    /// Seconds between pushes while the keepalive watchdog runs.
    pub fast: u32,
    /// Seconds between pushes otherwise.
    pub slow: u32,
}

impl Default for PushFrequency {
    fn default() -> Self {
        Self { fast: 5, slow: 60 }
    }
}

impl PushFrequency {
    /// Range-check before persisting. Never clamps.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fast == 0 {
            return Err(ConfigError::ValidationFailed("fast must be >= 1"));
        }
        if self.slow == 0 {
            return Err(ConfigError::ValidationFailed("slow must be >= 1"));
        }
        if self.fast > self.slow {
            return Err(ConfigError::ValidationFailed("fast must be <= slow"));
        }
        if self.slow > MAX_PUSH_SECS {
            return Err(ConfigError::ValidationFailed("slow exceeds one day"));
        }
        Ok(())
    }
}

/// Runtime configuration for one [`Engine`](crate::app::service::Engine).
#[derive(Debug, Clone)]
pub struct EngineConfig {
    // --- Push cadence ---
    pub push: PushFrequency,
    /// Watchdog budget granted by a keepalive (seconds).
    pub watchdog_secs: u32,

    // --- MCU polling ---
    /// Seconds between poll commands; zero or negative disables polling.
    pub mcu_poll_secs: i32,

    // --- Timing ---
    /// Ticks to wait after start before the scheduler runs.
    pub settle_secs: u32,
    /// Tick period (milliseconds).
    pub tick_ms: u32,

    // --- Models ---
    pub models: ModelTable,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            push: PushFrequency::default(),
            watchdog_secs: 300, // 5 min
            mcu_poll_secs: 2,
            settle_secs: 5,
            tick_ms: 1000, // 1 Hz
            models: ModelTable::default(),
        }
    }
}
