//! Status cache, power-state tracking, and decoded status reports.
//!
//! The controller answers the two poll commands with frames carrying the
//! same command id (0x0B status, 0x0C temperatures). The latest of each is
//! cached verbatim as `sc_11` / `sc_12`; clients parse them with their own
//! per-model tables, so the cache never rewrites the bytes.
//!
//! Decoded [`StatusReport`] / [`TemperatureReport`] values exist for local
//! callers and logs only.

use log::{debug, info};
use serde::Serialize;

use crate::device::ModelProfile;

use super::framer::Frame;

/// Command id of the status reply (`sc_11`).
pub const STATUS_ID: u8 = 0x0B;

/// Command id of the temperatures reply (`sc_12`).
pub const TEMPERATURES_ID: u8 = 0x0C;

/// Triple value the controller uses for "probe not connected".
const NO_PROBE: u16 = 960;

// ═══════════════════════════════════════════════════════════════
//  Status cache
// ═══════════════════════════════════════════════════════════════

/// Latest raw replies for ids 11 and 12.
#[derive(Debug, Default, Clone)]
pub struct StatusCache {
    sc_11: Option<Frame>,
    sc_12: Option<Frame>,
}

/// Host-facing view of the cache: uppercase hex, empty when absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusSnapshot {
    pub sc_11: String,
    pub sc_12: String,
}

impl StatusCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `frame` if it is a status or temperatures reply.
    pub fn record(&mut self, frame: &Frame) -> bool {
        let slot = match frame.command_id() {
            Some(STATUS_ID) => &mut self.sc_11,
            Some(TEMPERATURES_ID) => &mut self.sc_12,
            _ => return false,
        };
        *slot = Some(frame.clone());
        true
    }

    pub fn get(&self, id: u8) -> Option<&Frame> {
        match id {
            STATUS_ID => self.sc_11.as_ref(),
            TEMPERATURES_ID => self.sc_12.as_ref(),
            _ => None,
        }
    }

    /// Drop both entries; any reply now pending supersedes them.
    pub fn clear(&mut self) {
        self.sc_11 = None;
        self.sc_12 = None;
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            sc_11: self.sc_11.as_ref().map(Frame::to_hex).unwrap_or_default(),
            sc_12: self.sc_12.as_ref().map(Frame::to_hex).unwrap_or_default(),
        }
    }

    /// Non-empty entries in id order, as pushed to the relay.
    pub fn latest_hex(&self) -> Vec<String> {
        [&self.sc_11, &self.sc_12]
            .into_iter()
            .flatten()
            .map(Frame::to_hex)
            .collect()
    }
}

// ═══════════════════════════════════════════════════════════════
//  Power state
// ═══════════════════════════════════════════════════════════════

/// Edge reported by [`PowerMonitor::observe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerTransition {
    TurnedOn,
    TurnedOff,
}

/// Tracks `moduleIsOn` from status replies.
///
/// Without an offset (unknown model) the state stays off forever.
#[derive(Debug, Clone)]
pub struct PowerMonitor {
    offset: Option<usize>,
    on: bool,
}

impl PowerMonitor {
    pub fn new(offset: Option<usize>) -> Self {
        Self { offset, on: false }
    }

    pub fn is_on(&self) -> bool {
        self.on
    }

    /// Whether this monitor can derive power state at all.
    pub fn is_known(&self) -> bool {
        self.offset.is_some()
    }

    /// Update from a status frame. Non-status frames and frames too short
    /// for the offset leave the state untouched.
    pub fn observe(&mut self, frame: &Frame) -> Option<PowerTransition> {
        if frame.command_id() != Some(STATUS_ID) {
            return None;
        }
        let offset = self.offset?;
        let Some(byte) = frame.as_bytes().get(offset) else {
            debug!("Power: status frame too short ({} <= {})", frame.len(), offset);
            return None;
        };
        let on = byte & 0x01 != 0;
        if on == self.on {
            return None;
        }
        self.on = on;
        info!("Power: module {}", if on { "on" } else { "off" });
        Some(if on {
            PowerTransition::TurnedOn
        } else {
            PowerTransition::TurnedOff
        })
    }
}

// ═══════════════════════════════════════════════════════════════
//  Decoded reports
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusErrors {
    pub err1: bool,
    pub err2: bool,
    pub err3: bool,
    pub high_temp_err: bool,
    pub fan_err: bool,
    pub hot_err: bool,
    pub motor_err: bool,
    pub no_pellets: bool,
}

impl StatusErrors {
    pub fn any(&self) -> bool {
        self.err1
            || self.err2
            || self.err3
            || self.high_temp_err
            || self.fan_err
            || self.hot_err
            || self.motor_err
            || self.no_pellets
    }
}

/// Decoded 0x0B reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub p1_target: Option<i16>,
    pub p2_target: Option<i16>,
    pub p1_temp: Option<i16>,
    pub p2_temp: Option<i16>,
    pub p3_temp: Option<i16>,
    pub p4_temp: Option<i16>,
    pub smoker_act_temp: Option<i16>,
    /// Set point, reported when `condGrillTemp == 1`.
    pub grill_set_temp: Option<i16>,
    /// Measured temperature, reported otherwise.
    pub grill_temp: Option<i16>,
    pub module_is_on: bool,
    pub errors: StatusErrors,
    pub fan_state: bool,
    pub hot_state: bool,
    pub motor_state: bool,
    pub light_state: bool,
    pub is_fahrenheit: bool,
    pub recipe_step: u8,
    /// Remaining recipe time in seconds.
    pub recipe_time: u32,
}

/// Decoded 0x0C reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemperatureReport {
    pub p1_target: Option<i16>,
    pub p2_target: Option<i16>,
    pub p1_temp: Option<i16>,
    pub p2_temp: Option<i16>,
    pub p3_temp: Option<i16>,
    pub p4_temp: Option<i16>,
    pub smoker_act_temp: Option<i16>,
    pub grill_set_temp: Option<i16>,
    pub grill_temp: Option<i16>,
    pub is_fahrenheit: bool,
}

/// Sequential reader over a frame body.
struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn byte(&mut self) -> Option<u8> {
        let b = *self.bytes.get(self.pos)?;
        self.pos += 1;
        Some(b)
    }

    fn flag(&mut self) -> Option<bool> {
        self.byte().map(|b| b != 0)
    }

    /// Three decimal digits, one per byte. `Some(None)` for "no probe".
    fn triple(&mut self) -> Option<Option<u16>> {
        let d2 = u16::from(self.byte()?);
        let d1 = u16::from(self.byte()?);
        let d0 = u16::from(self.byte()?);
        let value = d2 * 100 + d1 * 10 + d0;
        Some((value != NO_PROBE).then_some(value))
    }

    fn optional_triple(&mut self, present: bool) -> Option<Option<u16>> {
        if present { self.triple() } else { Some(None) }
    }
}

/// Temperature in the caller's units.
fn to_units(raw: Option<u16>, convert: bool) -> Option<i16> {
    raw.map(|t| {
        if convert {
            ((f32::from(t) - 32.0) / 1.8).floor() as i16
        } else {
            t as i16
        }
    })
}

impl StatusReport {
    /// Decode a status frame under `profile`. `None` if the frame is not a
    /// status reply or is shorter than the layout requires.
    pub fn parse(frame: &Frame, profile: &ModelProfile) -> Option<Self> {
        if frame.command_id() != Some(STATUS_ID) {
            return None;
        }
        let layout = profile.layout;
        let mut c = Cursor::new(frame.payload());

        let p1_target = c.triple()?;
        let p2_target = c.optional_triple(layout.p2_target)?;
        let p1_temp = c.triple()?;
        let p2_temp = c.triple()?;
        let p3_temp = c.triple()?;
        let p4_temp = c.optional_triple(layout.p4_temp)?;
        let smoker_act_temp = c.optional_triple(layout.smoker_act_temp)?;
        let grill = c.triple()?;
        let cond_grill_temp = c.byte()?;
        let _module_byte = c.byte()?;
        let errors = StatusErrors {
            err1: c.flag()?,
            err2: c.flag()?,
            err3: c.flag()?,
            high_temp_err: c.flag()?,
            fan_err: c.flag()?,
            hot_err: c.flag()?,
            motor_err: c.flag()?,
            no_pellets: c.flag()?,
        };
        let fan_state = c.flag()?;
        let hot_state = c.flag()?;
        let motor_state = c.flag()?;
        let light_state = c.flag()?;
        let is_fahrenheit = c.flag()?;
        let recipe_step = c.byte()?;
        let hours = u32::from(c.byte()?);
        let minutes = u32::from(c.byte()?);
        let seconds = u32::from(c.byte()?);

        // Pinned offsets take precedence over the layout position.
        let module_is_on = frame
            .as_bytes()
            .get(profile.power_offset())
            .is_some_and(|b| b & 0x01 != 0);

        let convert = profile.converts_units && !is_fahrenheit;
        let (grill_set_temp, grill_temp) = if cond_grill_temp == 1 {
            (to_units(grill, convert), None)
        } else {
            (None, to_units(grill, convert))
        };

        Some(Self {
            p1_target: to_units(p1_target, convert),
            p2_target: to_units(p2_target, convert),
            p1_temp: to_units(p1_temp, convert),
            p2_temp: to_units(p2_temp, convert),
            p3_temp: to_units(p3_temp, convert),
            p4_temp: to_units(p4_temp, convert),
            smoker_act_temp: to_units(smoker_act_temp, convert),
            grill_set_temp,
            grill_temp,
            module_is_on,
            errors,
            fan_state,
            hot_state,
            motor_state,
            light_state,
            is_fahrenheit,
            recipe_step,
            recipe_time: hours * 3600 + minutes * 60 + seconds,
        })
    }
}

impl TemperatureReport {
    pub fn parse(frame: &Frame, profile: &ModelProfile) -> Option<Self> {
        if frame.command_id() != Some(TEMPERATURES_ID) {
            return None;
        }
        let layout = profile.layout;
        let mut c = Cursor::new(frame.payload());

        let p1_target = c.triple()?;
        let p2_target = c.optional_triple(layout.p2_target)?;
        let p1_temp = c.triple()?;
        let p2_temp = c.triple()?;
        let p3_temp = c.triple()?;
        let p4_temp = c.optional_triple(layout.p4_temp)?;
        let smoker_act_temp = c.optional_triple(layout.smoker_act_temp)?;
        let grill_set_temp = c.triple()?;
        let grill_temp = c.triple()?;
        let is_fahrenheit = c.flag()?;

        let convert = profile.converts_units && !is_fahrenheit;
        Some(Self {
            p1_target: to_units(p1_target, convert),
            p2_target: to_units(p2_target, convert),
            p1_temp: to_units(p1_temp, convert),
            p2_temp: to_units(p2_temp, convert),
            p3_temp: to_units(p3_temp, convert),
            p4_temp: to_units(p4_temp, convert),
            smoker_act_temp: to_units(smoker_act_temp, convert),
            grill_set_temp: to_units(grill_set_temp, convert),
            grill_temp: to_units(grill_temp, convert),
            is_fahrenheit,
        })
    }
}
