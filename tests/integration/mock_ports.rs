//! Mock ports for integration tests.
//!
//! Records every frame written to the controller and every document
//! written to the relay so tests can assert on the full history.

use pelletlink::adapters::clock::ManualClock;
use pelletlink::adapters::mem_store::MemStore;
use pelletlink::adapters::sim_mcu::SimMcu;
use pelletlink::app::events::AppEvent;
use pelletlink::app::ports::{EventSink, McuError, McuPort, Ports, RelayError, RelayPort};
use pelletlink::app::service::Engine;
use pelletlink::config::EngineConfig;
use pelletlink::device::{DeviceId, StatusLayout};
use pelletlink::rpc::message::Params;
use pelletlink::uart::{McuCommand, PollKind};
use serde_json::Value;

// ── Controller side ───────────────────────────────────────────

#[derive(Default)]
pub struct RecordingMcu {
    pub frames: Vec<Vec<u8>>,
    pub fail: bool,
}

impl McuPort for RecordingMcu {
    fn send_frame(&mut self, frame: &[u8]) -> Result<(), McuError> {
        if self.fail {
            return Err(McuError::WriteFailed);
        }
        self.frames.push(frame.to_vec());
        Ok(())
    }
}

#[allow(dead_code)]
impl RecordingMcu {
    pub fn last(&self) -> Option<&[u8]> {
        self.frames.last().map(Vec::as_slice)
    }

    /// Command ids of every frame written, in order.
    pub fn ids(&self) -> Vec<u8> {
        self.frames.iter().filter_map(|f| f.get(1).copied()).collect()
    }
}

// ── Relay side ────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingRelay {
    pub sent: Vec<String>,
}

impl RelayPort for RecordingRelay {
    fn send_text(&mut self, text: &str) -> Result<(), RelayError> {
        self.sent.push(text.to_string());
        Ok(())
    }
}

#[allow(dead_code)]
impl RecordingRelay {
    pub fn json(&self) -> Vec<Value> {
        self.sent
            .iter()
            .map(|s| serde_json::from_str(s).unwrap())
            .collect()
    }

    /// Push envelopes only (`id == -1`).
    pub fn pushes(&self) -> Vec<Value> {
        self.json().into_iter().filter(|v| v["id"] == -1).collect()
    }

    pub fn last_json(&self) -> Value {
        serde_json::from_str(self.sent.last().expect("nothing sent")).unwrap()
    }
}

// ── Event sink ────────────────────────────────────────────────

#[derive(Default)]
pub struct CollectingSink {
    pub events: Vec<AppEvent>,
}

impl EventSink for CollectingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

// ── Harness ───────────────────────────────────────────────────

pub struct Harness {
    pub mcu: RecordingMcu,
    pub relay: RecordingRelay,
    pub store: MemStore,
    pub clock: ManualClock,
    pub sink: CollectingSink,
}

#[allow(dead_code)]
impl Harness {
    pub fn new() -> Self {
        Self {
            mcu: RecordingMcu::default(),
            relay: RecordingRelay::default(),
            store: MemStore::new(),
            clock: ManualClock::at(100.0),
            sink: CollectingSink::default(),
        }
    }

    pub fn ports(&mut self) -> Ports<'_> {
        Ports {
            mcu: &mut self.mcu,
            relay: &mut self.relay,
            store: &mut self.store,
            clock: &self.clock,
            sink: &mut self.sink,
        }
    }

    /// Engine with no settle delay and polling disabled, so tests control
    /// exactly what goes to the controller.
    pub fn engine(&mut self, device: &str) -> Engine {
        let config = EngineConfig {
            settle_secs: 0,
            mcu_poll_secs: 0,
            ..EngineConfig::default()
        };
        self.engine_with(device, &config)
    }

    pub fn engine_with(&mut self, device: &str, config: &EngineConfig) -> Engine {
        let id = DeviceId::parse(device).unwrap();
        Engine::new(config, id, &mut self.ports())
    }

    /// Bring the relay link up; the network-notify frame is recorded.
    pub fn connect(&mut self, engine: &mut Engine) {
        assert!(engine.begin_relay_connect());
        engine.relay_connected(&mut self.ports());
    }

    pub fn ticks(&mut self, engine: &mut Engine, n: usize) {
        for _ in 0..n {
            engine.tick(&mut self.ports());
            self.clock.advance(1.0);
        }
    }

    pub fn call(&mut self, engine: &mut Engine, method: &str, params: Value) -> Result<Value, i32> {
        let params = params_of(params);
        engine
            .call(method, &params, &mut self.ports())
            .map_err(|e| e.code())
    }

    /// Serve `text` as if it came over the relay and return the reply.
    pub fn relay(&mut self, engine: &mut Engine, text: &str) -> Option<Value> {
        let before = self.relay.sent.len();
        engine.handle_relay_text(text, &mut self.ports());
        (self.relay.sent.len() > before).then(|| self.relay.last_json())
    }

    pub fn feed(&mut self, engine: &mut Engine, bytes: &[u8]) {
        engine.ingest(bytes, &mut self.ports());
    }
}

pub fn params_of(value: Value) -> Params {
    match value {
        Value::Object(map) => map,
        Value::Null => Params::new(),
        other => panic!("params must be an object, got {other}"),
    }
}

/// A status reply exactly as a board with `layout` sends it.
#[allow(dead_code)]
pub fn status_reply(layout: StatusLayout, on: bool) -> Vec<u8> {
    reply(layout, on, PollKind::Status)
}

#[allow(dead_code)]
pub fn temperatures_reply(layout: StatusLayout) -> Vec<u8> {
    reply(layout, false, PollKind::Temperatures)
}

fn reply(layout: StatusLayout, on: bool, kind: PollKind) -> Vec<u8> {
    let mut sim = SimMcu::new(layout).without_noise();
    if on {
        sim.power_on();
    }
    let poll = McuCommand::Poll(kind).to_frame().unwrap();
    sim.send_frame(poll.as_bytes()).unwrap();
    sim.drain_chunks().concat()
}
