//! Application core — the protocol engine behind port traits.
//!
//! [`service::Engine`] owns the framer, status cache, scheduler and relay
//! link. All interaction with the controller board, the relay socket,
//! storage and the clock happens through the **port traits** in
//! [`ports`], so the whole engine runs in tests against in-memory fakes.

pub mod events;
pub mod ports;
pub mod service;
