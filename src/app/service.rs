//! Protocol engine — the hexagonal core.
//!
//! [`Engine`] owns every piece of protocol state: the frame carry-over
//! buffer, the status cache, power tracking, scheduler countdowns, the
//! relay link, credentials and the virtual-data overlay. All I/O flows
//! through the [`Ports`] bundle passed into each call, so the whole engine
//! runs against mock adapters in tests.
//!
//! ```text
//!   UART bytes ──▶ ┌──────────────────────────┐ ──▶ McuPort
//!   relay text ──▶ │          Engine          │ ──▶ RelayPort
//!         tick ──▶ │ Framer · Cache · Sched   │ ──▶ EventSink
//!                  └──────────────────────────┘
//! ```
//!
//! One event is processed to completion before the next is looked at.

use log::{debug, info, warn};
use serde_json::Value;

use crate::config::{EngineConfig, PushFrequency};
use crate::device::{DeviceId, ModelProfile};
use crate::error::RpcError;
use crate::events::EngineEvent;
use crate::rpc::auth::Credentials;
use crate::rpc::dispatcher;
use crate::rpc::message::{Inbound, Params, ReplyContext, parse_inbound, reply_text};
use crate::rpc::relay::{self, LinkState, RelayLink};
use crate::scheduler::PollingScheduler;
use crate::uart::status::{STATUS_ID, StatusReport, TEMPERATURES_ID, TemperatureReport};
use crate::uart::{
    Frame, Framer, McuCommand, PollKind, PowerMonitor, PowerTransition, StatusCache,
    StatusSnapshot,
};

use super::events::{AppEvent, Captured};
use super::ports::{ConfigError, McuError, Ports, ScheduleFired, SchedulerDelegate};

// ───────────────────────────────────────────────────────────────
// Tick collection
// ───────────────────────────────────────────────────────────────

/// What the scheduler asked for during one tick; acted on after the
/// tick returns.
#[derive(Debug, Default)]
struct TickActions {
    poll: Option<PollKind>,
    push: bool,
}

impl SchedulerDelegate for TickActions {
    fn on_schedule_fired(&mut self, fired: ScheduleFired) {
        match fired {
            ScheduleFired::McuPoll(kind) => self.poll = Some(kind),
            ScheduleFired::Push => self.push = true,
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Engine
// ───────────────────────────────────────────────────────────────

pub struct Engine {
    device: DeviceId,
    profile: Option<ModelProfile>,
    framer: Framer,
    status: StatusCache,
    power: PowerMonitor,
    scheduler: PollingScheduler,
    relay: RelayLink,
    credentials: Credentials,
    overlay: Option<Params>,
    p_state: Option<String>,
}

impl Engine {
    /// Build the engine for `device`, loading credentials and the stored
    /// push cadence.
    pub fn new(config: &EngineConfig, device: DeviceId, ports: &mut Ports<'_>) -> Self {
        let profile = config.models.lookup(device.prefix()).copied();
        if profile.is_none() {
            warn!(
                "Engine: unknown model prefix {}, power state unavailable",
                device.prefix()
            );
        }
        let power = PowerMonitor::new(profile.map(|p| p.power_offset()));

        let mut scheduler = PollingScheduler::new(config);
        match ports.store.load() {
            Ok(Some(freq)) => scheduler.set_push_frequency(freq),
            Ok(None) => {}
            Err(e) => warn!("Engine: stored push cadence unusable ({}), using defaults", e),
        }

        let credentials = Credentials::load(ports.store.storage());

        ports.sink.emit(&AppEvent::Started {
            device_id: device.to_string(),
            power_known: power.is_known(),
        });
        info!("Engine started for {}", device);

        Self {
            device,
            profile,
            framer: Framer::new(),
            status: StatusCache::new(),
            power,
            scheduler,
            relay: RelayLink::new(),
            credentials,
            overlay: None,
            p_state: None,
        }
    }

    // ── Event entry point ─────────────────────────────────────

    pub fn handle_event(&mut self, event: EngineEvent, ports: &mut Ports<'_>) {
        match event {
            EngineEvent::Tick => self.tick(ports),
            EngineEvent::Uart(bytes) => self.ingest(&bytes, ports),
            EngineEvent::Relay(text) => self.handle_relay_text(&text, ports),
            EngineEvent::RelayUp => self.relay_connected(ports),
            EngineEvent::RelayDown => self.relay_disconnected(ports),
        }
    }

    // ── UART side ─────────────────────────────────────────────

    /// Feed controller bytes; every completed frame updates the cache.
    pub fn ingest(&mut self, bytes: &[u8], ports: &mut Ports<'_>) {
        let frames: Vec<Frame> = self.framer.ingest(bytes).collect();
        for frame in &frames {
            self.on_frame(frame, ports);
        }
    }

    fn on_frame(&mut self, frame: &Frame, ports: &mut Ports<'_>) {
        debug!("Engine: rx {}", frame.to_hex());
        if !self.status.record(frame) {
            debug!("Engine: ignoring frame id {:?}", frame.command_id());
            return;
        }
        if let Some(transition) = self.power.observe(frame) {
            if transition == PowerTransition::TurnedOff && self.overlay.take().is_some() {
                info!("Engine: module off, virtual data cleared");
            }
            ports.sink.emit(&AppEvent::Power(transition));
        }
        ports
            .sink
            .emit(&AppEvent::StatusCaptured(self.decode(frame)));
    }

    fn decode(&self, frame: &Frame) -> Captured {
        let decoded = self.profile.as_ref().and_then(|profile| match frame.command_id() {
            Some(STATUS_ID) => StatusReport::parse(frame, profile).map(Captured::Status),
            Some(TEMPERATURES_ID) => {
                TemperatureReport::parse(frame, profile).map(Captured::Temperatures)
            }
            _ => None,
        });
        decoded.unwrap_or(Captured::Raw {
            command_id: frame.command_id().unwrap_or_default(),
            len: frame.len(),
        })
    }

    /// Write a typed command.
    pub fn send_command(
        &mut self,
        command: McuCommand,
        ports: &mut Ports<'_>,
    ) -> Result<(), RpcError> {
        let frame = command.to_frame()?;
        self.send_frame(&frame, ports)?;
        Ok(())
    }

    /// Write a caller-supplied frame.
    pub fn send_raw(&mut self, frame: &Frame, ports: &mut Ports<'_>) -> Result<(), McuError> {
        self.send_frame(frame, ports)
    }

    /// Every outbound frame leaves both cache slots empty; the previous
    /// replies are stale until the controller answers.
    fn send_frame(&mut self, frame: &Frame, ports: &mut Ports<'_>) -> Result<(), McuError> {
        self.status.clear();
        ports.mcu.send_frame(frame.as_bytes()).inspect_err(|e| {
            warn!("Engine: tx {} failed: {}", frame.to_hex(), e);
        })?;
        debug!("Engine: tx {}", frame.to_hex());
        ports.sink.emit(&AppEvent::CommandSent {
            command_id: frame.command_id(),
        });
        Ok(())
    }

    // ── Scheduler ─────────────────────────────────────────────

    /// Advance the scheduler one tick and carry out what fired.
    pub fn tick(&mut self, ports: &mut Ports<'_>) {
        let mut actions = TickActions::default();
        self.scheduler.tick(self.power.is_on(), &mut actions);

        // Push before polling so the push still carries the last replies.
        if actions.push {
            self.push(ports);
        }
        if let Some(kind) = actions.poll {
            if let Err(e) = self.send_command(McuCommand::Poll(kind), ports) {
                warn!("Engine: {:?} poll not sent: {}", kind, e);
            }
        }
    }

    fn push(&mut self, ports: &mut Ports<'_>) {
        let text = match relay::push_text(
            self.device.as_str(),
            &self.status,
            self.overlay.as_ref(),
            self.p_state.as_deref(),
        ) {
            Ok(text) => text,
            Err(e) => {
                warn!("Engine: push not rendered: {}", e);
                return;
            }
        };
        if self.relay.write(ports.relay, &text).is_ok() {
            ports.sink.emit(&AppEvent::Pushed {
                entries: self.status.latest_hex().len(),
                with_overlay: self.overlay.is_some(),
            });
        }
    }

    /// Validate, persist, then apply a new push cadence.
    pub fn set_push_frequency(
        &mut self,
        freq: PushFrequency,
        ports: &mut Ports<'_>,
    ) -> Result<(), ConfigError> {
        freq.validate()?;
        ports.store.save(&freq)?;
        self.scheduler.set_push_frequency(freq);
        Ok(())
    }

    /// Replace the overlay and push on the next tick.
    pub fn set_overlay(&mut self, overlay: Params) {
        self.overlay = Some(overlay);
        self.scheduler.force_push();
    }

    // ── RPC ───────────────────────────────────────────────────

    /// Local call, no envelope.
    pub fn call(
        &mut self,
        method: &str,
        params: &Params,
        ports: &mut Ports<'_>,
    ) -> Result<Value, RpcError> {
        let outcome = dispatcher::dispatch(self, ports, method, params);
        match &outcome {
            Ok(_) => debug!("RPC: {} ok", method),
            Err(e) => {
                warn!("RPC: {} rejected: {}", method, e);
                ports.sink.emit(&AppEvent::RpcRejected {
                    method: method.to_string(),
                    code: e.code(),
                });
            }
        }
        outcome
    }

    /// Serve one inbound JSON document and render the reply, if any.
    /// Relay and GATT traffic both come through here.
    pub fn serve_text(&mut self, text: &str, ports: &mut Ports<'_>) -> Option<String> {
        match parse_inbound(text) {
            Inbound::SetPState(state) => {
                info!("Engine: pState = {:?}", state);
                self.p_state = (!state.is_empty()).then_some(state);
                None
            }
            Inbound::Malformed { reply, error } => {
                warn!("RPC: malformed message: {}", error);
                self.render_reply(&reply, &Err(error))
            }
            Inbound::Request(req) => {
                let outcome = self.call(&req.method, &req.params, ports);
                self.render_reply(&req.context(), &outcome)
            }
        }
    }

    fn render_reply(
        &self,
        ctx: &ReplyContext,
        outcome: &Result<Value, RpcError>,
    ) -> Option<String> {
        reply_text(ctx, self.device.as_str(), outcome)
            .inspect_err(|e| warn!("RPC: reply not rendered: {}", e))
            .ok()
    }

    pub fn handle_relay_text(&mut self, text: &str, ports: &mut Ports<'_>) {
        if let Some(reply) = self.serve_text(text, ports) {
            // Dropped while disconnected; the link logs it.
            let _ = self.relay.write(ports.relay, &reply);
        }
    }

    // ── Relay link ────────────────────────────────────────────

    /// Claim the connect slot before dialing.
    pub fn begin_relay_connect(&mut self) -> bool {
        self.relay.begin_connect()
    }

    pub fn relay_connected(&mut self, ports: &mut Ports<'_>) {
        if self.relay.connected() {
            ports.sink.emit(&AppEvent::RelayLink { up: true });
            self.notify_network(true, ports);
        }
    }

    pub fn relay_disconnected(&mut self, ports: &mut Ports<'_>) {
        if self.relay.disconnected() {
            ports.sink.emit(&AppEvent::RelayLink { up: false });
            self.notify_network(false, ports);
        }
    }

    fn notify_network(&mut self, up: bool, ports: &mut Ports<'_>) {
        if let Err(e) = self.send_command(McuCommand::NetworkStatus(up), ports) {
            warn!("Engine: network notify not sent: {}", e);
        }
    }

    pub fn relay_state(&self) -> LinkState {
        self.relay.state()
    }

    // ── Accessors ─────────────────────────────────────────────

    pub fn device_id(&self) -> &DeviceId {
        &self.device
    }

    pub fn profile(&self) -> Option<&ModelProfile> {
        self.profile.as_ref()
    }

    pub fn module_is_on(&self) -> bool {
        self.power.is_on()
    }

    pub fn power_known(&self) -> bool {
        self.power.is_known()
    }

    pub fn status_snapshot(&self) -> StatusSnapshot {
        self.status.snapshot()
    }

    /// Decoded view of the cached status reply.
    pub fn status_report(&self) -> Option<StatusReport> {
        let profile = self.profile.as_ref()?;
        StatusReport::parse(self.status.get(STATUS_ID)?, profile)
    }

    /// Decoded view of the cached temperatures reply.
    pub fn temperature_report(&self) -> Option<TemperatureReport> {
        let profile = self.profile.as_ref()?;
        TemperatureReport::parse(self.status.get(TEMPERATURES_ID)?, profile)
    }

    pub fn scheduler(&self) -> &PollingScheduler {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut PollingScheduler {
        &mut self.scheduler
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn credentials_mut(&mut self) -> &mut Credentials {
        &mut self.credentials
    }

    pub fn overlay(&self) -> Option<&Params> {
        self.overlay.as_ref()
    }

    pub fn p_state(&self) -> Option<&str> {
        self.p_state.as_deref()
    }

    /// Bytes waiting in the frame carry-over buffer.
    pub fn buffered(&self) -> usize {
        self.framer.buffered()
    }
}
