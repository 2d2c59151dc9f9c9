//! RPC flows through the engine: password gate, credential rotation,
//! cadence settings and the informational methods.

use pelletlink::app::events::{AppEvent, CredentialKind};
use pelletlink::app::ports::{ClockPort, StoragePort};
use pelletlink::config::EngineConfig;
use pelletlink::rpc::auth::{client_psw, client_secret};
use serde_json::json;

use crate::mock_ports::Harness;

fn locked(h: &mut Harness, password: &[u8]) -> pelletlink::app::service::Engine {
    let mut engine = h.engine("PBL-000001");
    h.call(
        &mut engine,
        "PB.SetDevicePassword",
        json!({ "newPassword": client_secret(password) }),
    )
    .unwrap();
    assert!(engine.credentials().has_password());
    engine
}

#[test]
fn everything_open_without_password() {
    let mut h = Harness::new();
    let mut engine = h.engine("PBL-000001");
    assert!(h.call(&mut engine, "PB.GetState", json!({})).is_ok());
    assert!(h.call(&mut engine, "PB.GetState", json!({ "psw": "junk" })).is_ok());
}

#[test]
fn gated_methods_need_current_psw() {
    let mut h = Harness::new();
    let mut engine = locked(&mut h, b"grill");

    assert_eq!(h.call(&mut engine, "PB.GetState", json!({})), Err(401));
    assert_eq!(h.call(&mut engine, "PB.GetState", json!({ "psw": 42 })), Err(401));
    assert_eq!(h.call(&mut engine, "PB.GetState", json!({ "psw": "zz" })), Err(401));

    let psw = client_psw(b"grill", h.clock.uptime_secs());
    assert!(h.call(&mut engine, "PB.GetState", json!({ "psw": psw })).is_ok());

    let wrong = client_psw(b"smoker", h.clock.uptime_secs());
    assert_eq!(h.call(&mut engine, "PB.GetState", json!({ "psw": wrong })), Err(401));

    assert!(h.sink.events.iter().any(|e| matches!(
        e,
        AppEvent::RpcRejected { method, code: 401 } if method == "PB.GetState"
    )));
}

#[test]
fn psw_tolerates_one_bucket_of_drift() {
    let mut h = Harness::new();
    let mut engine = locked(&mut h, b"grill");
    let psw = client_psw(b"grill", h.clock.uptime_secs());

    h.clock.advance(10.0);
    assert!(h.call(&mut engine, "PB.GetState", json!({ "psw": psw })).is_ok());
    h.clock.advance(10.0);
    assert_eq!(h.call(&mut engine, "PB.GetState", json!({ "psw": psw })), Err(401));
}

#[test]
fn open_methods_ignore_password() {
    let mut h = Harness::new();
    let mut engine = locked(&mut h, b"grill");
    for method in [
        "PB.GetTime",
        "PB.KeepAlive",
        "PB.GetMCU_UpdateFrequency",
        "PB.GetWifiUpdateFrequency",
        "PB.GetFirmwareVersion",
        "RPC.Ping",
    ] {
        assert!(h.call(&mut engine, method, json!({})).is_ok(), "{method}");
    }
    assert_eq!(
        h.call(&mut engine, "PB.SetWifiUpdateFrequency", json!({ "fast": 1, "slow": 2 })),
        Err(401)
    );
}

#[test]
fn password_rotation_needs_old_password() {
    let mut h = Harness::new();
    let mut engine = locked(&mut h, b"old");
    let rotate = json!({ "newPassword": client_secret(b"new") });
    assert_eq!(h.call(&mut engine, "PB.SetDevicePassword", rotate.clone()), Err(401));

    let mut with_psw = rotate;
    with_psw["psw"] = json!(client_psw(b"old", h.clock.uptime_secs()));
    h.call(&mut engine, "PB.SetDevicePassword", with_psw).unwrap();

    let psw = client_psw(b"new", h.clock.uptime_secs());
    assert!(h.call(&mut engine, "PB.GetState", json!({ "psw": psw })).is_ok());
}

#[test]
fn password_survives_restart_sealed() {
    let mut h = Harness::new();
    drop(locked(&mut h, b"hunter2"));

    let stored = h.store.raw("auth", "psw").unwrap().to_vec();
    assert!(!stored.windows(7).any(|w| w == b"hunter2"));

    let mut engine = h.engine("PBL-000001");
    assert_eq!(h.call(&mut engine, "PB.GetState", json!({})), Err(401));
    let psw = client_psw(b"hunter2", h.clock.uptime_secs());
    assert!(h.call(&mut engine, "PB.GetState", json!({ "psw": psw })).is_ok());
}

#[test]
fn device_name_rules() {
    let mut h = Harness::new();
    let mut engine = h.engine("PBL-000001");
    for bad in ["", " Smokey", "Smokey ", "a\nb"] {
        assert_eq!(
            h.call(&mut engine, "PB.SetDeviceName", json!({ "name": bad })),
            Err(400),
            "{bad:?}"
        );
    }
    let ok = h
        .call(&mut engine, "PB.SetDeviceName", json!({ "name": "Back Yard" }))
        .unwrap();
    assert_eq!(ok, json!({ "name": "Back Yard" }));
    assert_eq!(h.store.raw("dev", "name"), Some(&b"Back Yard"[..]));
    assert_eq!(engine.credentials().name(), Some("Back Yard"));
}

#[test]
fn wifi_credentials_sealed_and_never_echoed() {
    let mut h = Harness::new();
    let mut engine = h.engine("PBL-000001");

    assert_eq!(
        h.call(&mut engine, "PB.SetWifiCredentials", json!({ "ssid": "", "pass": client_secret(b"x") })),
        Err(400)
    );
    assert_eq!(
        h.call(&mut engine, "PB.SetWifiCredentials", json!({ "ssid": "home", "pass": "nothex" })),
        Err(400)
    );

    let reply = h
        .call(
            &mut engine,
            "PB.SetWifiCredentials",
            json!({ "ssid": "home", "pass": client_secret(b"s3cret-pass") }),
        )
        .unwrap();
    assert_eq!(reply, json!({ "ssid": "home" }));
    assert!(h.store.exists("wifi", "pass"));
    assert_ne!(h.store.raw("wifi", "pass"), Some(&b"s3cret-pass"[..]));
    assert_eq!(engine.credentials().wifi_pass().unwrap(), b"s3cret-pass");
    assert!(h.sink.events.iter().any(|e| matches!(
        e,
        AppEvent::CredentialsChanged(CredentialKind::WifiCredentials)
    )));
}

#[test]
fn push_cadence_validated_and_persisted() {
    let mut h = Harness::new();
    let mut engine = h.engine("PBL-000001");
    for bad in [
        json!({ "fast": 0, "slow": 10 }),
        json!({ "fast": 20, "slow": 10 }),
        json!({ "fast": -1, "slow": 10 }),
        json!({ "fast": "5", "slow": 10 }),
        json!({ "fast": 5 }),
    ] {
        assert_eq!(
            h.call(&mut engine, "PB.SetWifiUpdateFrequency", bad.clone()),
            Err(400),
            "{bad}"
        );
    }
    h.call(&mut engine, "PB.SetWifiUpdateFrequency", json!({ "fast": 3, "slow": 30 }))
        .unwrap();

    let mut restarted = h.engine("PBL-000001");
    assert_eq!(
        h.call(&mut restarted, "PB.GetWifiUpdateFrequency", json!({})),
        Ok(json!({ "fast": 3, "slow": 30 }))
    );
}

#[test]
fn mcu_frequency_is_runtime_only() {
    let mut h = Harness::new();
    let mut engine = h.engine("PBL-000001");
    assert_eq!(
        h.call(&mut engine, "PB.SetMCU_UpdateFrequency", json!({ "frequency": "2" })),
        Err(400)
    );
    h.call(&mut engine, "PB.SetMCU_UpdateFrequency", json!({ "frequency": 4 }))
        .unwrap();
    assert_eq!(
        h.call(&mut engine, "PB.GetMCU_UpdateFrequency", json!({})),
        Ok(json!({ "frequency": 4 }))
    );

    h.call(&mut engine, "PB.SetMCU_UpdateFrequency", json!({ "frequency": -1 }))
        .unwrap();
    h.ticks(&mut engine, 10);
    assert!(h.mcu.frames.is_empty());

    let restarted = h.engine_with("PBL-000001", &EngineConfig::default());
    assert_eq!(
        restarted.scheduler().mcu_interval(),
        EngineConfig::default().mcu_poll_secs
    );
}

#[test]
fn info_methods() {
    let mut h = Harness::new();
    let mut engine = h.engine("PBL-000001");
    assert_eq!(
        h.call(&mut engine, "PB.GetTime", json!({})),
        Ok(json!({ "time": 100.0 }))
    );
    assert_eq!(
        h.call(&mut engine, "PB.GetFirmwareVersion", json!({})),
        Ok(json!({ "firmwareVersion": env!("CARGO_PKG_VERSION") }))
    );
    assert_eq!(h.call(&mut engine, "RPC.Ping", json!(null)), Ok(json!({})));
    assert_eq!(h.call(&mut engine, "PB.Unknown", json!({})), Err(404));
}
