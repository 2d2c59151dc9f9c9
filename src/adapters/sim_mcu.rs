//! Simulated grill controller.
//!
//! Implements [`McuPort`] by interpreting each written frame the way a
//! controller board would, and queues its replies as raw bytes. Replies
//! leave in small chunks with a noise byte ahead of each frame, so the
//! reader side exercises reassembly and pre-marker discard.

use std::collections::VecDeque;

use log::{debug, info};

use crate::app::ports::{McuError, McuPort};
use crate::device::StatusLayout;
use crate::uart::Frame;
use crate::uart::commands::{
    LIGHT_ID, NETWORK_ID, POWER_OFF_ID, PRIMER_ID, SET_TEMPERATURE_ID, UNITS_ID,
};
use crate::uart::status::{STATUS_ID, TEMPERATURES_ID};

/// "Probe not connected" triple value.
const NO_PROBE: u16 = 960;

/// Ambient reading while the fire is out.
const AMBIENT: u16 = 70;

/// Degrees per tick the grill moves towards its set point.
const RAMP: u16 = 5;

/// Default reply chunk size.
const DEFAULT_CHUNK: usize = 7;

/// Board state. Temperatures are the digits the board reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrillState {
    pub on: bool,
    pub light: bool,
    pub primer: bool,
    pub fahrenheit: bool,
    pub grill_temp: u16,
    pub grill_set: u16,
    pub p1_temp: Option<u16>,
    pub p1_target: u16,
    pub p2_temp: Option<u16>,
    pub p2_target: u16,
}

impl Default for GrillState {
    fn default() -> Self {
        Self {
            on: false,
            light: false,
            primer: false,
            fahrenheit: true,
            grill_temp: AMBIENT,
            grill_set: 225,
            p1_temp: Some(AMBIENT),
            p1_target: 165,
            p2_temp: None,
            p2_target: 0,
        }
    }
}

pub struct SimMcu {
    layout: StatusLayout,
    state: GrillState,
    outbox: VecDeque<u8>,
    chunk: usize,
    noise: bool,
    received: Vec<Frame>,
}

impl SimMcu {
    pub fn new(layout: StatusLayout) -> Self {
        Self {
            layout,
            state: GrillState::default(),
            outbox: VecDeque::new(),
            chunk: DEFAULT_CHUNK,
            noise: true,
            received: Vec::new(),
        }
    }

    /// Reply chunk size; at least one byte.
    pub fn with_chunk(mut self, chunk: usize) -> Self {
        self.chunk = chunk.max(1);
        self
    }

    pub fn without_noise(mut self) -> Self {
        self.noise = false;
        self
    }

    pub fn state(&self) -> &GrillState {
        &self.state
    }

    /// Physical power switch.
    pub fn power_on(&mut self) {
        self.state.on = true;
        info!("SimMcu: powered on");
    }

    /// Every frame written so far.
    pub fn received(&self) -> &[Frame] {
        &self.received
    }

    /// Advance the fire by one tick.
    pub fn step(&mut self) {
        let target = if self.state.on { self.state.grill_set } else { AMBIENT };
        let t = self.state.grill_temp;
        self.state.grill_temp = if t < target {
            (t + RAMP).min(target)
        } else {
            t.saturating_sub(RAMP).max(target)
        };
    }

    /// Pending reply bytes, split into chunks.
    pub fn drain_chunks(&mut self) -> Vec<Vec<u8>> {
        let bytes: Vec<u8> = self.outbox.drain(..).collect();
        bytes.chunks(self.chunk).map(<[u8]>::to_vec).collect()
    }

    fn handle(&mut self, frame: &Frame) {
        let payload = frame.payload();
        let arg = payload.first().copied();
        match frame.command_id() {
            Some(STATUS_ID) => self.reply(self.status_frame()),
            Some(TEMPERATURES_ID) => self.reply(self.temperatures_frame()),
            Some(POWER_OFF_ID) => {
                self.state.on = false;
                info!("SimMcu: power off");
            }
            Some(LIGHT_ID) => self.state.light = arg == Some(1),
            Some(PRIMER_ID) => self.state.primer = arg == Some(1),
            Some(UNITS_ID) => self.state.fahrenheit = !self.state.fahrenheit,
            Some(SET_TEMPERATURE_ID) => self.set_temperature(payload),
            Some(NETWORK_ID) => debug!("SimMcu: network {:?}", arg),
            other => debug!("SimMcu: ignoring command {:02X?}", other),
        }
    }

    fn set_temperature(&mut self, payload: &[u8]) {
        let [selector, d2, d1, d0] = payload else {
            debug!("SimMcu: bad set-temperature payload");
            return;
        };
        let value = u16::from(*d2) * 100 + u16::from(*d1) * 10 + u16::from(*d0);
        match *selector {
            0x01 => self.state.grill_set = value,
            0x02 => self.state.p1_target = value,
            0x03 => self.state.p2_target = value,
            _ => debug!("SimMcu: unknown selector {:02X}", selector),
        }
    }

    fn reply(&mut self, frame: Frame) {
        if self.noise {
            self.outbox.push_back(0x00);
        }
        self.outbox.extend(frame.as_bytes());
    }

    fn status_frame(&self) -> Frame {
        let s = &self.state;
        let mut body = vec![STATUS_ID];
        self.push_probes(&mut body);
        push_triple(&mut body, Some(s.grill_temp));
        body.push(0); // measured, not set point
        body.push(u8::from(s.on));
        body.extend_from_slice(&[0; 8]);
        body.extend_from_slice(&[
            u8::from(s.on),
            u8::from(s.on && s.grill_temp < s.grill_set),
            u8::from(s.on || s.primer),
            u8::from(s.light),
        ]);
        body.push(u8::from(s.fahrenheit));
        body.extend_from_slice(&[0, 0, 0, 0]);
        Frame::encode(&body)
    }

    fn temperatures_frame(&self) -> Frame {
        let s = &self.state;
        let mut body = vec![TEMPERATURES_ID];
        self.push_probes(&mut body);
        push_triple(&mut body, Some(s.grill_set));
        push_triple(&mut body, Some(s.grill_temp));
        body.push(u8::from(s.fahrenheit));
        Frame::encode(&body)
    }

    /// Target and probe triples shared by both replies.
    fn push_probes(&self, body: &mut Vec<u8>) {
        let s = &self.state;
        push_triple(body, Some(s.p1_target));
        if self.layout.p2_target {
            push_triple(body, Some(s.p2_target));
        }
        push_triple(body, s.p1_temp);
        push_triple(body, s.p2_temp);
        push_triple(body, None);
        if self.layout.p4_temp {
            push_triple(body, None);
        }
        if self.layout.smoker_act_temp {
            push_triple(body, Some(s.grill_temp));
        }
    }
}

impl McuPort for SimMcu {
    fn send_frame(&mut self, frame: &[u8]) -> Result<(), McuError> {
        let frame = Frame::from_wire(frame).ok_or(McuError::WriteFailed)?;
        self.handle(&frame);
        self.received.push(frame);
        Ok(())
    }
}

fn push_triple(body: &mut Vec<u8>, value: Option<u16>) {
    let v = value.unwrap_or(NO_PROBE).min(999);
    body.extend_from_slice(&[(v / 100) as u8, (v / 10 % 10) as u8, (v % 10) as u8]);
}
