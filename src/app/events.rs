//! Outbound application events.
//!
//! The [`Engine`](super::service::Engine) emits these through the
//! [`EventSink`](super::ports::EventSink) port. Adapters decide where
//! they go; the default one logs them.

use crate::uart::status::{StatusReport, TemperatureReport};
use crate::uart::PowerTransition;

/// What the engine learned from a captured reply.
#[derive(Debug, Clone)]
pub enum Captured {
    Status(StatusReport),
    Temperatures(TemperatureReport),
    /// Cached, but not decodable under the device's model profile.
    Raw { command_id: u8, len: usize },
}

/// Structured events emitted by the engine.
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// Engine constructed; carries the device id and whether power
    /// state can be derived for its model.
    Started { device_id: String, power_known: bool },

    /// `moduleIsOn` changed.
    Power(PowerTransition),

    /// A 0x0B / 0x0C reply was cached.
    StatusCaptured(Captured),

    /// A frame was written to the controller.
    CommandSent { command_id: Option<u8> },

    /// A push envelope went out over the relay.
    Pushed { entries: usize, with_overlay: bool },

    /// Relay link state changed.
    RelayLink { up: bool },

    /// A persisted credential or name was replaced.
    CredentialsChanged(CredentialKind),

    /// An RPC handler returned an error.
    RpcRejected { method: String, code: i32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialKind {
    DevicePassword,
    WifiCredentials,
    DeviceName,
}
