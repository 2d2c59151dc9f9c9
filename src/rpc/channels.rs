//! Outbound relay channel.
//!
//! The engine loop is synchronous; the relay writer blocks on the socket.
//! An `embassy-sync` bounded channel sits between them so the engine
//! never waits on I/O.
//!
//! ```text
//! ┌──────────────┐   reply / push text   ┌──────────────┐
//! │  Engine loop │──────────────────────▶│ Relay writer │
//! │  (sync)      │                       │  (blocking)  │
//! └──────────────┘                       └──────────────┘
//! ```

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use log::warn;

use crate::app::ports::{RelayError, RelayPort};

/// Channel depth for outbound relay documents.
pub const REPLY_DEPTH: usize = 16;

pub type ReplyQueue = Channel<CriticalSectionRawMutex, String, REPLY_DEPTH>;

/// Process-wide queue used by the simulator's writer thread.
pub static REPLY_CHANNEL: ReplyQueue = Channel::new();

/// [`RelayPort`] that enqueues instead of writing.
pub struct QueuedRelay<'q> {
    queue: &'q ReplyQueue,
}

impl<'q> QueuedRelay<'q> {
    pub fn new(queue: &'q ReplyQueue) -> Self {
        Self { queue }
    }
}

impl RelayPort for QueuedRelay<'_> {
    fn send_text(&mut self, text: &str) -> Result<(), RelayError> {
        self.queue.try_send(text.to_string()).map_err(|_| {
            warn!("Relay queue full, dropping {} bytes", text.len());
            RelayError::WriteFailed
        })
    }
}
