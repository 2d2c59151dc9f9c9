//! Relay link: connection state and outbound push rendering.
//!
//! The socket itself belongs to the transport adapter. This side only
//! tracks whether a connection exists, refuses a second connect attempt
//! while one is in flight, and drops writes while disconnected.
//! Reconnect timing is the adapter's business.

use log::{debug, info, warn};

use crate::app::ports::{RelayError, RelayPort};
use crate::uart::StatusCache;

use super::message::{Params, PushEnvelope};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Disconnected,
    Connecting,
    Connected,
}

#[derive(Debug)]
pub struct RelayLink {
    state: LinkState,
    dropped: u32,
}

impl Default for RelayLink {
    fn default() -> Self {
        Self::new()
    }
}

impl RelayLink {
    pub fn new() -> Self {
        Self {
            state: LinkState::Disconnected,
            dropped: 0,
        }
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == LinkState::Connected
    }

    /// Claim the single connect slot. `false` if an attempt is already in
    /// flight or the link is up.
    pub fn begin_connect(&mut self) -> bool {
        if self.state != LinkState::Disconnected {
            debug!("Relay: connect suppressed ({:?})", self.state);
            return false;
        }
        self.state = LinkState::Connecting;
        info!("Relay: connecting");
        true
    }

    /// Returns `true` on an actual edge.
    pub fn connected(&mut self) -> bool {
        let edge = self.state != LinkState::Connected;
        self.state = LinkState::Connected;
        if edge {
            info!("Relay: connected");
        }
        edge
    }

    /// Clears the connection; covers a failed attempt as well. Returns
    /// `true` if the link had been up.
    pub fn disconnected(&mut self) -> bool {
        let was_up = self.state == LinkState::Connected;
        self.state = LinkState::Disconnected;
        if was_up {
            info!("Relay: disconnected");
        }
        was_up
    }

    /// Writes dropped because the link was down.
    pub fn dropped(&self) -> u32 {
        self.dropped
    }

    pub fn write(&mut self, port: &mut dyn RelayPort, text: &str) -> Result<(), RelayError> {
        if !self.is_connected() {
            self.dropped = self.dropped.saturating_add(1);
            debug!("Relay: not connected, dropping {} bytes", text.len());
            return Err(RelayError::NotConnected);
        }
        port.send_text(text).inspect_err(|e| {
            warn!("Relay: write failed: {}", e);
        })
    }
}

/// Render the push envelope for the current cache and overlay.
pub fn push_text(
    src: &str,
    cache: &StatusCache,
    overlay: Option<&Params>,
    p_state: Option<&str>,
) -> Result<String, serde_json::Error> {
    let mut envelope = PushEnvelope::new(src, cache.latest_hex());
    envelope.data = overlay;
    envelope.p_state = p_state;
    envelope.to_text()
}
