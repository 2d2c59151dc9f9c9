//! Method registry and handlers.
//!
//! Every method carries its own `requires_password` flag. There is no
//! blanket policy: read-only cadence queries, keepalive, time and ping
//! are open, everything that reads cached device data or changes state is
//! gated. The gate passes while no device password is set.
//!
//! Parameters are validated strictly; a wrong type or a missing field is
//! an [`ErrorKind::InvalidParams`](crate::error::ErrorKind) reply, never a
//! coercion.

use log::{info, warn};
use serde_json::{Value, json};

use crate::app::events::{AppEvent, CredentialKind};
use crate::app::ports::Ports;
use crate::app::service::Engine;
use crate::config::PushFrequency;
use crate::error::{ErrorKind, RpcError};
use crate::uart::Frame;

use super::auth;
use super::message::{Params, require_int, require_str};

/// Field carrying the time-keyed password on gated methods.
pub const PASSWORD_FIELD: &str = "psw";

type Outcome = Result<Value, RpcError>;

type Handler = fn(&mut Engine, &mut Ports<'_>, &Params) -> Outcome;

/// One registered method.
pub struct MethodSpec {
    pub name: &'static str,
    pub requires_password: bool,
    handler: Handler,
}

const fn method(name: &'static str, requires_password: bool, handler: Handler) -> MethodSpec {
    MethodSpec {
        name,
        requires_password,
        handler,
    }
}

pub static METHODS: &[MethodSpec] = &[
    method("PB.SendMCUCommand", true, send_mcu_command),
    method("PB.GetState", true, get_state),
    method("PB.GetMCU_UpdateFrequency", false, get_mcu_frequency),
    method("PB.SetMCU_UpdateFrequency", false, set_mcu_frequency),
    method("PB.GetWifiUpdateFrequency", false, get_push_frequency),
    method("PB.SetWifiUpdateFrequency", true, set_push_frequency),
    method("PB.KeepAlive", false, keepalive),
    method("PB.SetVirtualData", true, set_virtual_data),
    method("PB.GetVirtualData", true, get_virtual_data),
    method("PB.SetDevicePassword", true, set_device_password),
    method("PB.SetDeviceName", true, set_device_name),
    method("PB.SetWifiCredentials", true, set_wifi_credentials),
    method("PB.GetTime", false, get_time),
    method("PB.GetFirmwareVersion", false, get_firmware_version),
    method("RPC.Ping", false, ping),
];

pub fn lookup(name: &str) -> Option<&'static MethodSpec> {
    METHODS.iter().find(|m| m.name == name)
}

/// Run one call to completion.
pub fn dispatch(
    engine: &mut Engine,
    ports: &mut Ports<'_>,
    method: &str,
    params: &Params,
) -> Outcome {
    let Some(spec) = lookup(method) else {
        warn!("RPC: unknown method {}", method);
        return Err(RpcError::new(
            ErrorKind::MethodNotFound,
            format!("no such method: {method}"),
        ));
    };
    if spec.requires_password {
        authorize(engine, ports, params)?;
    }
    (spec.handler)(engine, ports, params)
}

fn authorize(engine: &Engine, ports: &Ports<'_>, params: &Params) -> Result<(), RpcError> {
    let psw = match params.get(PASSWORD_FIELD) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.as_str()),
        Some(_) => return Err(RpcError::unauthorized()),
    };
    engine
        .credentials()
        .verify(psw, ports.clock.uptime_secs())
        .map_err(|e| {
            warn!("RPC: auth failed: {}", e);
            RpcError::unauthorized()
        })
}

// ── Controller ────────────────────────────────────────────────

fn send_mcu_command(engine: &mut Engine, ports: &mut Ports<'_>, params: &Params) -> Outcome {
    let command = require_str(params, "command")?;
    if command.is_empty() {
        return Err(RpcError::invalid_params("'command' must not be empty"));
    }
    let bytes = hex::decode(command)
        .map_err(|_| RpcError::invalid_params("'command' must be a hex string"))?;
    // Full wire form passes through; a bare body gets the markers.
    let frame = Frame::from_wire(&bytes).unwrap_or_else(|| Frame::encode(&bytes));
    engine.send_raw(&frame, ports)?;
    Ok(json!({}))
}

fn get_state(engine: &mut Engine, _: &mut Ports<'_>, _: &Params) -> Outcome {
    let snap = engine.status_snapshot();
    Ok(json!({ "sc_11": snap.sc_11, "sc_12": snap.sc_12 }))
}

// ── Cadence ───────────────────────────────────────────────────

fn get_mcu_frequency(engine: &mut Engine, _: &mut Ports<'_>, _: &Params) -> Outcome {
    Ok(json!({ "frequency": engine.scheduler().mcu_interval() }))
}

fn set_mcu_frequency(engine: &mut Engine, _: &mut Ports<'_>, params: &Params) -> Outcome {
    let secs = i32::try_from(require_int(params, "frequency")?)
        .map_err(|_| RpcError::invalid_params("'frequency' out of range"))?;
    engine.scheduler_mut().set_mcu_interval(secs);
    Ok(json!({ "frequency": secs }))
}

fn get_push_frequency(engine: &mut Engine, _: &mut Ports<'_>, _: &Params) -> Outcome {
    let freq = engine.scheduler().push_frequency();
    Ok(json!({ "fast": freq.fast, "slow": freq.slow }))
}

fn set_push_frequency(engine: &mut Engine, ports: &mut Ports<'_>, params: &Params) -> Outcome {
    let secs = |key: &str| {
        u32::try_from(require_int(params, key)?)
            .map_err(|_| RpcError::invalid_params(format!("'{key}' out of range")))
    };
    let freq = PushFrequency {
        fast: secs("fast")?,
        slow: secs("slow")?,
    };
    engine.set_push_frequency(freq, ports)?;
    Ok(json!({ "fast": freq.fast, "slow": freq.slow }))
}

fn keepalive(engine: &mut Engine, _: &mut Ports<'_>, _: &Params) -> Outcome {
    engine.scheduler_mut().keepalive();
    Ok(json!({ "watchdog": engine.scheduler().watchdog_remaining() }))
}

// ── Overlay ───────────────────────────────────────────────────

fn set_virtual_data(engine: &mut Engine, _: &mut Ports<'_>, params: &Params) -> Outcome {
    if !engine.module_is_on() {
        return Err(RpcError::conflict("module is off"));
    }
    let mut overlay = params.clone();
    overlay.remove(PASSWORD_FIELD);
    engine.set_overlay(overlay);
    Ok(json!({}))
}

fn get_virtual_data(engine: &mut Engine, _: &mut Ports<'_>, _: &Params) -> Outcome {
    if !engine.module_is_on() {
        return Err(RpcError::conflict("module is off"));
    }
    Ok(Value::Object(engine.overlay().cloned().unwrap_or_default()))
}

// ── Credentials ───────────────────────────────────────────────

fn set_device_password(engine: &mut Engine, ports: &mut Ports<'_>, params: &Params) -> Outcome {
    let plain =
        auth::open_secret(require_str(params, "newPassword")?).map_err(RpcError::invalid_params)?;
    engine
        .credentials_mut()
        .set_password(ports.store.storage_mut(), &plain)?;
    ports
        .sink
        .emit(&AppEvent::CredentialsChanged(CredentialKind::DevicePassword));
    Ok(json!({}))
}

fn set_device_name(engine: &mut Engine, ports: &mut Ports<'_>, params: &Params) -> Outcome {
    let name = require_str(params, "name")?;
    auth::validate_name(name).map_err(RpcError::invalid_params)?;
    engine
        .credentials_mut()
        .set_name(ports.store.storage_mut(), name)?;
    ports
        .sink
        .emit(&AppEvent::CredentialsChanged(CredentialKind::DeviceName));
    Ok(json!({ "name": name }))
}

fn set_wifi_credentials(engine: &mut Engine, ports: &mut Ports<'_>, params: &Params) -> Outcome {
    let ssid = require_str(params, "ssid")?;
    auth::validate_ssid(ssid).map_err(RpcError::invalid_params)?;
    let pass = auth::open_secret(require_str(params, "pass")?).map_err(RpcError::invalid_params)?;
    engine
        .credentials_mut()
        .set_wifi(ports.store.storage_mut(), ssid, &pass)?;
    ports
        .sink
        .emit(&AppEvent::CredentialsChanged(CredentialKind::WifiCredentials));
    info!("RPC: wifi credentials stored for {}", ssid);
    Ok(json!({ "ssid": ssid }))
}

// ── Info ──────────────────────────────────────────────────────

fn get_time(_: &mut Engine, ports: &mut Ports<'_>, _: &Params) -> Outcome {
    Ok(json!({ "time": ports.clock.uptime_secs() }))
}

fn get_firmware_version(_: &mut Engine, _: &mut Ports<'_>, _: &Params) -> Outcome {
    Ok(json!({ "firmwareVersion": env!("CARGO_PKG_VERSION") }))
}

fn ping(_: &mut Engine, _: &mut Ports<'_>, _: &Params) -> Outcome {
    Ok(json!({}))
}
