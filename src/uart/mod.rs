//! Controller UART protocol: delimiter framing, cached replies, command
//! builders.

pub mod commands;
pub mod framer;
pub mod status;

pub use commands::{McuCommand, PollKind, TempTarget};
pub use framer::{Frame, Framer, RAW_BUFFER_CAP};
pub use status::{PowerMonitor, PowerTransition, StatusCache, StatusSnapshot};
