//! Port traits: the boundary between the protocol engine and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ Engine (domain)
//! ```
//!
//! The controller UART, the relay socket, persistent storage, the uptime
//! clock and the event log are all reached through these traits. The
//! [`Engine`](super::service::Engine) receives them per call as a
//! [`Ports`] bundle, so it never owns a transport.
//!
//! ## Security notes
//!
//! - **ConfigPort** implementations MUST validate before persisting.
//! - Secrets handed to **StoragePort** are already codec-transformed;
//!   adapters store them as opaque bytes.

use crate::config::PushFrequency;

// ───────────────────────────────────────────────────────────────
// Controller UART (domain → MCU)
// ───────────────────────────────────────────────────────────────

/// Write side of the controller link.
pub trait McuPort {
    /// Write one complete, delimited frame.
    fn send_frame(&mut self, frame: &[u8]) -> Result<(), McuError>;
}

// ───────────────────────────────────────────────────────────────
// Relay socket (domain → remote callers)
// ───────────────────────────────────────────────────────────────

/// Write side of the relay channel. One JSON document per call.
pub trait RelayPort {
    fn send_text(&mut self, text: &str) -> Result<(), RelayError>;
}

// ───────────────────────────────────────────────────────────────
// Clock
// ───────────────────────────────────────────────────────────────

/// Monotonic uptime source. Cipher buckets are derived from it.
pub trait ClockPort {
    fn uptime_secs(&self) -> f64;
}

// ───────────────────────────────────────────────────────────────
// Event sink (domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The engine emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Configuration port (domain ↔ persistent push cadence)
// ───────────────────────────────────────────────────────────────

/// Loads and persists the push cadence.
///
/// # Security
///
/// Implementations MUST validate before persisting and reject invalid
/// values with [`ConfigError::ValidationFailed`] rather than clamping.
/// A zero slow interval would silence pushes for good.
pub trait ConfigPort {
    /// `None` if nothing is stored.
    fn load(&self) -> Result<Option<PushFrequency>, ConfigError>;

    fn save(&mut self, freq: &PushFrequency) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Storage port (domain ↔ namespaced key-value store)
// ───────────────────────────────────────────────────────────────

/// Persistent key-value storage for credentials and the device name.
///
/// Keys are namespaced to prevent collisions between subsystems.
/// Writes MUST be atomic per key.
pub trait StoragePort {
    /// Read a value. Returns the number of bytes written to `buf`.
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError>;

    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError>;

    /// Returns `Ok(())` even if the key didn't exist.
    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError>;

    fn exists(&self, namespace: &str, key: &str) -> bool;
}

/// Both persistence ports behind one object.
pub trait Persistence: StoragePort + ConfigPort {
    fn storage(&self) -> &dyn StoragePort;
    fn storage_mut(&mut self) -> &mut dyn StoragePort;
}

impl<T: StoragePort + ConfigPort> Persistence for T {
    fn storage(&self) -> &dyn StoragePort {
        self
    }

    fn storage_mut(&mut self) -> &mut dyn StoragePort {
        self
    }
}

// ───────────────────────────────────────────────────────────────
// Scheduler delegate (decouples scheduler from the engine)
// ───────────────────────────────────────────────────────────────

/// Callback the [`PollingScheduler`](crate::scheduler::PollingScheduler)
/// invokes when a countdown expires.
pub trait SchedulerDelegate {
    fn on_schedule_fired(&mut self, fired: ScheduleFired);
}

/// What fired during a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleFired {
    /// MCU poll countdown expired; send this request.
    McuPoll(crate::uart::PollKind),
    /// Push countdown expired while the module was (or just was) on.
    Push,
}

// ───────────────────────────────────────────────────────────────
// Port bundle
// ───────────────────────────────────────────────────────────────

/// Everything outside the engine, borrowed for one event.
pub struct Ports<'a> {
    pub mcu: &'a mut dyn McuPort,
    pub relay: &'a mut dyn RelayPort,
    pub store: &'a mut dyn Persistence,
    pub clock: &'a dyn ClockPort,
    pub sink: &'a mut dyn EventSink,
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Stored blob failed deserialization.
    Corrupted,
    /// A field failed range validation; the message names it.
    ValidationFailed(&'static str),
    /// Generic I/O error from the storage backend.
    IoError,
}

/// Errors from [`StoragePort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    NotFound,
    Full,
    IoError,
}

/// Errors from [`McuPort`] writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum McuError {
    WriteFailed,
}

/// Errors from [`RelayPort`] writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayError {
    NotConnected,
    WriteFailed,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "key not found"),
            Self::Full => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl core::fmt::Display for McuError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::WriteFailed => write!(f, "UART write failed"),
        }
    }
}

impl core::fmt::Display for RelayError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotConnected => write!(f, "relay not connected"),
            Self::WriteFailed => write!(f, "relay write failed"),
        }
    }
}
