//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing each application event to the
//! `log` facade. Per-frame captures go to `debug`; state changes are
//! `info`, rejections `warn`.

use log::{debug, info, warn};

use crate::app::events::{AppEvent, Captured};
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`].
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started {
                device_id,
                power_known,
            } => {
                info!("START | device={} | power_known={}", device_id, power_known);
            }
            AppEvent::Power(transition) => {
                info!("POWER | {:?}", transition);
            }
            AppEvent::StatusCaptured(Captured::Status(s)) => {
                debug!(
                    "STATUS | on={} | grill={:?} set={:?} | p1={:?} p2={:?} | \
                     fan={} hot={} motor={} light={} | F={} | errors={}",
                    s.module_is_on,
                    s.grill_temp,
                    s.grill_set_temp,
                    s.p1_temp,
                    s.p2_temp,
                    s.fan_state,
                    s.hot_state,
                    s.motor_state,
                    s.light_state,
                    s.is_fahrenheit,
                    s.errors.any(),
                );
            }
            AppEvent::StatusCaptured(Captured::Temperatures(t)) => {
                debug!(
                    "TEMPS | grill={:?} set={:?} | p1={:?}/{:?} p2={:?}/{:?} | F={}",
                    t.grill_temp,
                    t.grill_set_temp,
                    t.p1_temp,
                    t.p1_target,
                    t.p2_temp,
                    t.p2_target,
                    t.is_fahrenheit,
                );
            }
            AppEvent::StatusCaptured(Captured::Raw { command_id, len }) => {
                debug!("FRAME | id=0x{:02X} | {} bytes (undecoded)", command_id, len);
            }
            AppEvent::CommandSent { command_id } => {
                debug!("TX | id={:02X?}", command_id);
            }
            AppEvent::Pushed {
                entries,
                with_overlay,
            } => {
                info!("PUSH | entries={} | overlay={}", entries, with_overlay);
            }
            AppEvent::RelayLink { up } => {
                info!("RELAY | {}", if *up { "up" } else { "down" });
            }
            AppEvent::CredentialsChanged(kind) => {
                info!("CREDENTIALS | {:?} updated", kind);
            }
            AppEvent::RpcRejected { method, code } => {
                warn!("RPC | {} rejected with {}", method, code);
            }
        }
    }
}
