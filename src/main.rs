//! PelletLink simulator — host entry point.
//!
//! Runs the protocol engine against a simulated controller board, with
//! stdin/stdout standing in for the relay socket: each stdin line is one
//! inbound JSON document, each stdout line one reply or push.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  SimMcu        QueuedRelay ─▶ stdout     MemStore  SystemClock │
//! │  (McuPort)     (RelayPort)               (Config+Storage)      │
//! │  LogEventSink  stdin ─▶ EventQueue                             │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │        Engine: Framer · StatusCache · Dispatcher       │    │
//! │  │                PollingScheduler · Relay               │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Usage: `pelletlink-sim [DEVICE-ID]` (default `PBL-00SIM1`).
#![deny(unused_must_use)]

use std::io::{BufRead, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::{Result, anyhow};
use embassy_sync::channel::Channel;
use log::{info, warn};

use pelletlink::adapters::clock::SystemClock;
use pelletlink::adapters::log_sink::LogEventSink;
use pelletlink::adapters::mem_store::MemStore;
use pelletlink::adapters::sim_mcu::SimMcu;
use pelletlink::app::ports::Ports;
use pelletlink::app::service::Engine;
use pelletlink::config::EngineConfig;
use pelletlink::device::{DeviceId, StatusLayout};
use pelletlink::events::{
    EngineEvent, EventQueue, drain_events, push_or_drain, send_event, uart_events,
};
use pelletlink::rpc::channels::{QueuedRelay, REPLY_CHANNEL};
use pelletlink::rpc::message::{Params, RequestIds, request_text};

const DEFAULT_DEVICE: &str = "PBL-00SIM1";

static EVENTS: EventQueue = Channel::new();
static STDIN_CLOSED: AtomicBool = AtomicBool::new(false);

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("PelletLink simulator v{}", env!("CARGO_PKG_VERSION"));

    let device_arg = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_DEVICE.to_string());
    let device = DeviceId::parse(&device_arg).map_err(|e| anyhow!("{}: {}", device_arg, e))?;

    let config = EngineConfig::default();
    let layout = config
        .models
        .lookup(device.prefix())
        .map_or(StatusLayout::DUAL_PROBE, |p| p.layout);

    // ── Adapters ──────────────────────────────────────────────
    let mut sim = SimMcu::new(layout);
    let mut relay = QueuedRelay::new(&REPLY_CHANNEL);
    let mut store = MemStore::new();
    let clock = SystemClock::new();
    let mut sink = LogEventSink::new();

    // ── Relay reader / writer threads ─────────────────────────
    std::thread::Builder::new()
        .name("relay-rx".into())
        .spawn(read_stdin)?;
    std::thread::Builder::new()
        .name("relay-tx".into())
        .spawn(write_stdout)?;

    let mut engine = {
        let mut ports = Ports {
            mcu: &mut sim,
            relay: &mut relay,
            store: &mut store,
            clock: &clock,
            sink: &mut sink,
        };
        let mut engine = Engine::new(&config, device, &mut ports);
        if engine.begin_relay_connect() {
            push_or_drain(&EVENTS, EngineEvent::RelayUp, &mut engine, &mut ports);
        }
        for text in greeting(&mut RequestIds::new())? {
            push_or_drain(&EVENTS, EngineEvent::Relay(text), &mut engine, &mut ports);
        }
        engine
    };
    sim.power_on();

    // ── Main loop ─────────────────────────────────────────────
    let tick = Duration::from_millis(u64::from(config.tick_ms));
    loop {
        std::thread::sleep(tick);
        sim.step();

        // Drain until the board has nothing more to say.
        let mut pending = vec![EngineEvent::Tick];
        loop {
            {
                let mut ports = Ports {
                    mcu: &mut sim,
                    relay: &mut relay,
                    store: &mut store,
                    clock: &clock,
                    sink: &mut sink,
                };
                for event in pending.drain(..) {
                    push_or_drain(&EVENTS, event, &mut engine, &mut ports);
                }
                drain_events(&EVENTS, &mut engine, &mut ports);
            }
            let chunks = sim.drain_chunks();
            if chunks.is_empty() {
                break;
            }
            pending.extend(chunks.iter().flat_map(|c| uart_events(c)));
        }

        if STDIN_CLOSED.load(Ordering::Acquire) && EVENTS.is_empty() {
            info!("stdin closed, stopping");
            break;
        }
    }

    // Let the writer flush what is queued.
    while !REPLY_CHANNEL.is_empty() {
        std::thread::sleep(Duration::from_millis(10));
    }
    Ok(())
}

/// Scripted client opening: what the companion app sends on connect.
fn greeting(ids: &mut RequestIds) -> Result<Vec<String>> {
    let texts = ["PB.GetFirmwareVersion", "PB.GetTime", "PB.KeepAlive"]
        .into_iter()
        .map(|method| request_text(ids.next_id(), method, &Params::new()))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(texts)
}

fn read_stdin() {
    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        match line {
            Ok(text) if text.trim().is_empty() => {}
            Ok(text) => send_event(&EVENTS, EngineEvent::Relay(text)),
            Err(e) => {
                warn!("relay-rx: {}", e);
                break;
            }
        }
    }
    send_event(&EVENTS, EngineEvent::RelayDown);
    STDIN_CLOSED.store(true, Ordering::Release);
}

fn write_stdout() {
    loop {
        let text = futures_lite::future::block_on(REPLY_CHANNEL.receive());
        let mut out = std::io::stdout().lock();
        if writeln!(out, "{}", text).and_then(|()| out.flush()).is_err() {
            warn!("relay-tx: stdout closed");
            return;
        }
    }
}
