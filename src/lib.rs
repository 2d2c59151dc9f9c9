//! PelletLink protocol engine.
//!
//! Bridges a pellet-grill controller board (framed UART) and a cloud
//! relay (JSON-RPC). Exposes the pure-logic modules for integration
//! testing; all I/O goes through the traits in [`app::ports`].

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod device;
pub mod error;
pub mod events;
pub mod rpc;
pub mod scheduler;
pub mod uart;
