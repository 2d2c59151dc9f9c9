//! Adapters — concrete implementations of the port traits.
//!
//! | Adapter     | Implements               | Connects to               |
//! |-------------|--------------------------|---------------------------|
//! | `clock`     | ClockPort                | `Instant` / manual time   |
//! | `log_sink`  | EventSink                | `log` facade              |
//! | `mem_store` | ConfigPort, StoragePort  | in-memory map             |
//! | `sim_mcu`   | McuPort                  | simulated grill board     |
//!
//! The relay side is served by
//! [`QueuedRelay`](crate::rpc::channels::QueuedRelay).

pub mod clock;
pub mod log_sink;
pub mod mem_store;
pub mod sim_mcu;
