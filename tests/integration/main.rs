//! Integration test driver for the `tests/integration/` submodules.
//!
//! Each `mod` below maps to a file that drives the engine end to end
//! against mock ports. Everything runs on the host; no board or relay
//! socket is needed.

mod engine_tests;
mod mock_ports;
mod rpc_tests;
