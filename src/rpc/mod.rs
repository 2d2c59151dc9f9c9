//! Relay-facing RPC subsystem.
//!
//! JSON-RPC over the relay socket (or reassembled GATT writes), with
//! credentials checked through a time-keyed codec.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                       RPC Stack                            │
//! │                                                            │
//! │  ┌──────────┐   ┌──────────┐   ┌───────────────────────┐   │
//! │  │  Relay   │──▶│ Message  │──▶│ Dispatcher (METHODS)  │   │
//! │  │  / GATT  │   │ (parse)  │   │  → Engine             │   │
//! │  └──────────┘   └──────────┘   └───────────────────────┘   │
//! │       ▲                                    │               │
//! │       │              ┌─────────────────────┘               │
//! │       │              ▼                                     │
//! │  ┌──────────┐   ┌──────────┐   ┌──────────┐                │
//! │  │ Channels │◀──│  Reply / │   │ Auth ·   │                │
//! │  │ (queue)  │   │  Push    │   │ Cipher   │                │
//! │  └──────────┘   └──────────┘   └──────────┘                │
//! └────────────────────────────────────────────────────────────┘
//! ```

pub mod auth;
pub mod channels;
pub mod cipher;
pub mod dispatcher;
pub mod gatt;
pub mod message;
pub mod relay;
