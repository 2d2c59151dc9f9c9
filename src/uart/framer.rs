//! Delimiter framer for the controller UART link.
//!
//! Wire format:
//! ```text
//! ┌──────┬────────────┬─────────────────┬──────┐
//! │ 0xFE │ command id │ payload (N B)   │ 0xFF │
//! └──────┴────────────┴─────────────────┴──────┘
//! ```
//!
//! There is no length field and no escaping. A payload byte equal to
//! `0xFF` ends the frame early; the controller never sends one, and the
//! framer does not try to guess otherwise.
//!
//! Bytes accumulate in a fixed 2048-byte carry-over buffer. A single
//! transport read may hold half a frame, several frames, or line noise;
//! frames are extracted lazily with [`Framer::next_frame`] or the
//! [`Frames`] iterator returned by [`Framer::ingest`].

use heapless::Vec as HVec;
use log::{debug, trace};

/// Start-of-frame marker.
pub const START_MARKER: u8 = 0xFE;

/// End-of-frame marker.
pub const END_MARKER: u8 = 0xFF;

/// Carry-over buffer capacity. On overflow the oldest bytes are dropped.
pub const RAW_BUFFER_CAP: usize = 2048;

/// One delimiter-bounded frame, markers included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    bytes: Vec<u8>,
}

impl Frame {
    /// Wrap an already-delimited byte sequence.
    ///
    /// Returns `None` unless `bytes` starts with [`START_MARKER`] and ends
    /// with [`END_MARKER`].
    pub fn from_wire(bytes: &[u8]) -> Option<Self> {
        match bytes {
            [START_MARKER, .., END_MARKER] => Some(Self {
                bytes: bytes.to_vec(),
            }),
            _ => None,
        }
    }

    /// Build an outbound frame around `body` (command id + payload).
    pub fn encode(body: &[u8]) -> Self {
        let mut bytes = Vec::with_capacity(body.len() + 2);
        bytes.push(START_MARKER);
        bytes.extend_from_slice(body);
        bytes.push(END_MARKER);
        Self { bytes }
    }

    /// Command id, or `None` for the empty frame `FE FF`.
    pub fn command_id(&self) -> Option<u8> {
        if self.bytes.len() > 2 {
            Some(self.bytes[1])
        } else {
            None
        }
    }

    /// Bytes between the command id and the end marker.
    pub fn payload(&self) -> &[u8] {
        if self.bytes.len() > 2 {
            &self.bytes[2..self.bytes.len() - 1]
        } else {
            &[]
        }
    }

    /// The whole frame as seen on the wire.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Uppercase hex of the whole frame (`"FE0B...FF"`).
    pub fn to_hex(&self) -> String {
        hex::encode_upper(&self.bytes)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Streaming frame extractor with a bounded carry-over buffer.
pub struct Framer {
    buf: HVec<u8, RAW_BUFFER_CAP>,
    /// Total bytes discarded as overflow or pre-marker noise.
    discarded: u64,
}

impl Framer {
    pub fn new() -> Self {
        Self {
            buf: HVec::new(),
            discarded: 0,
        }
    }

    /// Append transport bytes, keeping only the newest [`RAW_BUFFER_CAP`].
    pub fn push(&mut self, data: &[u8]) {
        if data.len() >= RAW_BUFFER_CAP {
            self.discarded += (self.buf.len() + data.len() - RAW_BUFFER_CAP) as u64;
            self.buf.clear();
            // Cannot fail: exactly RAW_BUFFER_CAP bytes into an empty buffer.
            let _ = self.buf.extend_from_slice(&data[data.len() - RAW_BUFFER_CAP..]);
            debug!("Framer: overflow, kept newest {} bytes", RAW_BUFFER_CAP);
            return;
        }

        let overflow = (self.buf.len() + data.len()).saturating_sub(RAW_BUFFER_CAP);
        if overflow > 0 {
            self.drop_front(overflow);
            self.discarded += overflow as u64;
            debug!("Framer: overflow, dropped {} oldest bytes", overflow);
        }
        let _ = self.buf.extend_from_slice(data);
    }

    /// Append `data` and return an iterator over every frame now complete.
    pub fn ingest<'a>(&'a mut self, data: &[u8]) -> Frames<'a> {
        self.push(data);
        Frames { framer: self }
    }

    /// Extract the next complete frame, if the buffer holds one.
    ///
    /// Bytes ahead of the first start marker are discarded once a marker
    /// is seen. Without any marker the buffer keeps accumulating.
    pub fn next_frame(&mut self) -> Option<Frame> {
        let start = self.buf.iter().position(|&b| b == START_MARKER)?;
        if start > 0 {
            trace!("Framer: skipping {} bytes of noise", start);
            self.drop_front(start);
            self.discarded += start as u64;
        }

        let end = self.buf[1..].iter().position(|&b| b == END_MARKER)? + 1;

        // A restart marker before the end supersedes the earlier one.
        let begin = self.buf[..end]
            .iter()
            .rposition(|&b| b == START_MARKER)
            .unwrap_or(0);
        if begin > 0 {
            self.discarded += begin as u64;
        }

        let frame = Frame {
            bytes: self.buf[begin..=end].to_vec(),
        };
        self.drop_front(end + 1);
        debug!("Framer: frame {:02X?} ({} bytes)", frame.command_id(), frame.len());
        Some(frame)
    }

    /// Bytes currently held in the carry-over buffer.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    pub fn discarded(&self) -> u64 {
        self.discarded
    }

    /// Forget any partial frame (e.g. after the UART is reopened).
    pub fn reset(&mut self) {
        self.buf.clear();
    }

    fn drop_front(&mut self, n: usize) {
        let len = self.buf.len();
        let n = n.min(len);
        self.buf.copy_within(n.., 0);
        self.buf.truncate(len - n);
    }
}

impl Default for Framer {
    fn default() -> Self {
        Self::new()
    }
}

/// Lazy iterator over the frames completed by one [`Framer::ingest`] call.
pub struct Frames<'a> {
    framer: &'a mut Framer,
}

impl Iterator for Frames<'_> {
    type Item = Frame;

    fn next(&mut self) -> Option<Frame> {
        self.framer.next_frame()
    }
}
