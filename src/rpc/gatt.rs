//! RPC over a GATT data/control characteristic pair.
//!
//! ```text
//! tx_ctl  ──▶ ┌────────────┐      BE u32 request length
//! data    ──▶ │ Reassembler│ ──▶  JSON request (same path as relay text)
//!             └────────────┘
//! rx_ctl  ◀── [BE u32 response length]
//! data    ◀── response in chunks of at most CHUNK_SIZE bytes
//! ```
//!
//! Each announcement starts a fresh message, discarding anything partial.

use core::fmt;

use log::{debug, warn};

/// Largest message accepted in either direction.
pub const MAX_MESSAGE: usize = 4096;

/// Length announcement size (big-endian u32).
pub const HEADER_SIZE: usize = 4;

/// Data characteristic write size.
pub const CHUNK_SIZE: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GattError {
    /// Control write was not exactly [`HEADER_SIZE`] bytes.
    BadHeader,
    /// Announced or supplied length is zero or over [`MAX_MESSAGE`].
    BadLength(usize),
    /// Data arrived with no announcement pending.
    Unexpected,
    /// More data than announced.
    Overrun,
}

impl fmt::Display for GattError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadHeader => write!(f, "length header must be {} bytes", HEADER_SIZE),
            Self::BadLength(n) => write!(f, "length {} outside 1..={}", n, MAX_MESSAGE),
            Self::Unexpected => write!(f, "data without length announcement"),
            Self::Overrun => write!(f, "data exceeds announced length"),
        }
    }
}

enum State {
    Idle,
    Receiving { expected: usize },
}

/// Collects data chunks into one announced message.
pub struct Reassembler {
    state: State,
    buf: heapless::Vec<u8, MAX_MESSAGE>,
}

impl Default for Reassembler {
    fn default() -> Self {
        Self::new()
    }
}

impl Reassembler {
    pub fn new() -> Self {
        Self {
            state: State::Idle,
            buf: heapless::Vec::new(),
        }
    }

    /// Handle a control-characteristic write.
    pub fn announce(&mut self, control: &[u8]) -> Result<usize, GattError> {
        self.reset();
        let header: [u8; HEADER_SIZE] = control.try_into().map_err(|_| GattError::BadHeader)?;
        let expected = u32::from_be_bytes(header) as usize;
        if expected == 0 || expected > MAX_MESSAGE {
            warn!("GATT: rejecting announced length {}", expected);
            return Err(GattError::BadLength(expected));
        }
        self.state = State::Receiving { expected };
        debug!("GATT: expecting {} bytes", expected);
        Ok(expected)
    }

    /// Handle a data-characteristic write. Returns the message once the
    /// announced length is reached.
    pub fn push_chunk(&mut self, chunk: &[u8]) -> Result<Option<Vec<u8>>, GattError> {
        let State::Receiving { expected } = self.state else {
            return Err(GattError::Unexpected);
        };
        if self.buf.len() + chunk.len() > expected || self.buf.extend_from_slice(chunk).is_err() {
            self.reset();
            return Err(GattError::Overrun);
        }
        if self.buf.len() < expected {
            return Ok(None);
        }
        let message = self.buf.to_vec();
        self.reset();
        Ok(Some(message))
    }

    pub fn is_receiving(&self) -> bool {
        matches!(self.state, State::Receiving { .. })
    }

    pub fn reset(&mut self) {
        self.state = State::Idle;
        self.buf.clear();
    }
}

/// Length announcement plus data chunks for a response.
pub fn chunk_response(
    payload: &[u8],
) -> Result<([u8; HEADER_SIZE], core::slice::Chunks<'_, u8>), GattError> {
    if payload.is_empty() || payload.len() > MAX_MESSAGE {
        return Err(GattError::BadLength(payload.len()));
    }
    let header = (payload.len() as u32).to_be_bytes();
    Ok((header, payload.chunks(CHUNK_SIZE)))
}
