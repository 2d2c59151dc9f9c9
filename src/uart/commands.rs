//! Typed builders for controller commands.
//!
//! Each command renders to a frame body (command id + argument bytes);
//! [`McuCommand::to_frame`] adds the markers.

use core::fmt;

use super::framer::Frame;
use super::status::{STATUS_ID, TEMPERATURES_ID};

pub const POWER_OFF_ID: u8 = 0x01;
pub const LIGHT_ID: u8 = 0x02;
pub const SET_TEMPERATURE_ID: u8 = 0x05;
pub const UNITS_ID: u8 = 0x09;
pub const NETWORK_ID: u8 = 0x24;
pub const PRIMER_ID: u8 = 0x80;

/// Highest set point the 3-digit encoding can carry.
pub const MAX_SET_POINT: u16 = 999;

/// Which poll the scheduler sends next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollKind {
    Status,
    Temperatures,
}

impl PollKind {
    pub fn other(self) -> Self {
        match self {
            Self::Status => Self::Temperatures,
            Self::Temperatures => Self::Status,
        }
    }
}

/// Set-temperature sub-selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TempTarget {
    Grill = 0x01,
    Probe1 = 0x02,
    Probe2 = 0x03,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum McuCommand {
    Poll(PollKind),
    PowerOff,
    Light(bool),
    SetTemperature { target: TempTarget, degrees: u16 },
    ToggleUnits,
    NetworkStatus(bool),
    Primer(bool),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandError {
    /// Set point does not fit three decimal digits.
    SetPointOutOfRange(u16),
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SetPointOutOfRange(t) => write!(f, "set point {t} exceeds {MAX_SET_POINT}"),
        }
    }
}

impl McuCommand {
    /// Frame body: command id followed by argument bytes.
    pub fn body(&self) -> Result<heapless::Vec<u8, 8>, CommandError> {
        let body = match *self {
            Self::Poll(PollKind::Status) => fixed(&[STATUS_ID, 0x01]),
            Self::Poll(PollKind::Temperatures) => fixed(&[TEMPERATURES_ID, 0x01]),
            Self::PowerOff => fixed(&[POWER_OFF_ID, 0x02]),
            Self::Light(on) => fixed(&[LIGHT_ID, u8::from(on)]),
            Self::SetTemperature { target, degrees } => {
                if degrees > MAX_SET_POINT {
                    return Err(CommandError::SetPointOutOfRange(degrees));
                }
                fixed(&[
                    SET_TEMPERATURE_ID,
                    target as u8,
                    (degrees / 100) as u8,
                    (degrees / 10 % 10) as u8,
                    (degrees % 10) as u8,
                ])
            }
            Self::ToggleUnits => fixed(&[UNITS_ID, 0x01]),
            Self::NetworkStatus(up) => fixed(&[NETWORK_ID, u8::from(up)]),
            Self::Primer(on) => fixed(&[PRIMER_ID, u8::from(on)]),
        };
        Ok(body)
    }

    pub fn to_frame(&self) -> Result<Frame, CommandError> {
        Ok(Frame::encode(&self.body()?))
    }
}

/// Every command body is at most 5 bytes, well under the capacity.
fn fixed(bytes: &[u8]) -> heapless::Vec<u8, 8> {
    heapless::Vec::from_slice(bytes).unwrap_or_default()
}
