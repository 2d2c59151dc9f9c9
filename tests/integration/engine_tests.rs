//! Engine end-to-end tests: controller frames in, RPC and pushes out.

use pelletlink::app::events::{AppEvent, Captured};
use pelletlink::app::service::Engine;
use pelletlink::config::EngineConfig;
use pelletlink::device::StatusLayout;
use pelletlink::rpc::relay::LinkState;
use pelletlink::uart::PowerTransition;
use serde_json::json;

use crate::mock_ports::{Harness, status_reply, temperatures_reply};

// ── Raw command and cached status ─────────────────────────────

#[test]
fn send_raw_clears_cache_then_reply_refills_it() {
    let mut h = Harness::new();
    let mut engine = h.engine("PBL-123456");

    h.feed(&mut engine, &status_reply(StatusLayout::DUAL_PROBE, false));
    h.feed(&mut engine, &temperatures_reply(StatusLayout::DUAL_PROBE));
    let state = h.call(&mut engine, "PB.GetState", json!({})).unwrap();
    assert!(!state["sc_11"].as_str().unwrap().is_empty());
    assert!(!state["sc_12"].as_str().unwrap().is_empty());

    let sent = h
        .call(&mut engine, "PB.SendMCUCommand", json!({ "command": "0B01" }))
        .unwrap();
    assert_eq!(sent, json!({}));
    assert_eq!(h.mcu.last(), Some(&[0xFE, 0x0B, 0x01, 0xFF][..]));

    let state = h.call(&mut engine, "PB.GetState", json!({})).unwrap();
    assert_eq!(state, json!({ "sc_11": "", "sc_12": "" }));

    h.feed(&mut engine, &[0xFE, 0x0B, 0x01, 0x02, 0x03, 0xFF]);
    let state = h.call(&mut engine, "PB.GetState", json!({})).unwrap();
    assert_eq!(state, json!({ "sc_11": "FE0B010203FF", "sc_12": "" }));
}

#[test]
fn send_raw_accepts_full_wire_form() {
    let mut h = Harness::new();
    let mut engine = h.engine("PBL-123456");
    h.call(&mut engine, "PB.SendMCUCommand", json!({ "command": "fe0c01ff" }))
        .unwrap();
    assert_eq!(h.mcu.last(), Some(&[0xFE, 0x0C, 0x01, 0xFF][..]));
}

#[test]
fn send_raw_validates_command() {
    let mut h = Harness::new();
    let mut engine = h.engine("PBL-123456");
    for bad in [json!({}), json!({ "command": "" }), json!({ "command": 11 }), json!({ "command": "0G" })] {
        assert_eq!(h.call(&mut engine, "PB.SendMCUCommand", bad), Err(400));
    }
    assert!(h.mcu.frames.is_empty());
}

#[test]
fn uart_write_failure_is_internal_error() {
    let mut h = Harness::new();
    let mut engine = h.engine("PBL-123456");
    h.mcu.fail = true;
    assert_eq!(
        h.call(&mut engine, "PB.SendMCUCommand", json!({ "command": "0B01" })),
        Err(500)
    );
}

#[test]
fn frames_split_across_reads_are_reassembled() {
    let mut h = Harness::new();
    let mut engine = h.engine("PBL-123456");
    let reply = status_reply(StatusLayout::DUAL_PROBE, true);
    let (a, b) = reply.split_at(9);
    h.feed(&mut engine, &[0x00, 0x13]);
    h.feed(&mut engine, a);
    assert!(!engine.module_is_on());
    h.feed(&mut engine, b);
    assert!(engine.module_is_on());
    assert_eq!(engine.buffered(), 0);
}

// ── Power state and overlay ───────────────────────────────────

#[test]
fn virtual_data_requires_power_then_pushes_next_tick() {
    let mut h = Harness::new();
    let mut engine = h.engine("PBL-123456");
    h.connect(&mut engine);

    assert_eq!(
        h.call(&mut engine, "PB.SetVirtualData", json!({ "mode": "smoke" })),
        Err(409)
    );

    h.feed(&mut engine, &status_reply(StatusLayout::DUAL_PROBE, true));
    assert!(engine.module_is_on());

    h.call(
        &mut engine,
        "PB.SetVirtualData",
        json!({ "mode": "smoke", "psw": null }),
    )
    .unwrap();
    assert!(h.relay.pushes().is_empty());

    h.ticks(&mut engine, 1);
    let pushes = h.relay.pushes();
    assert_eq!(pushes.len(), 1);
    assert_eq!(pushes[0]["src"], "PBL-123456");
    assert_eq!(pushes[0]["data"], json!({ "mode": "smoke" }));
    assert_eq!(pushes[0]["status"].as_array().unwrap().len(), 1);

    let overlay = h.call(&mut engine, "PB.GetVirtualData", json!({})).unwrap();
    assert_eq!(overlay, json!({ "mode": "smoke" }));
}

#[test]
fn overlay_cleared_when_module_turns_off() {
    let mut h = Harness::new();
    let mut engine = h.engine("PBL-123456");
    h.feed(&mut engine, &status_reply(StatusLayout::DUAL_PROBE, true));
    h.call(&mut engine, "PB.SetVirtualData", json!({ "x": 1 }))
        .unwrap();
    assert!(engine.overlay().is_some());

    h.feed(&mut engine, &status_reply(StatusLayout::DUAL_PROBE, false));
    assert!(engine.overlay().is_none());
    assert_eq!(h.call(&mut engine, "PB.GetVirtualData", json!({})), Err(409));

    let transitions: Vec<PowerTransition> = h
        .sink
        .events
        .iter()
        .filter_map(|e| match e {
            AppEvent::Power(t) => Some(*t),
            _ => None,
        })
        .collect();
    assert_eq!(
        transitions,
        vec![PowerTransition::TurnedOn, PowerTransition::TurnedOff]
    );
}

#[test]
fn get_virtual_data_empty_when_unset() {
    let mut h = Harness::new();
    let mut engine = h.engine("PBL-123456");
    h.feed(&mut engine, &status_reply(StatusLayout::DUAL_PROBE, true));
    assert_eq!(
        h.call(&mut engine, "PB.GetVirtualData", json!({})),
        Ok(json!({}))
    );
}

#[test]
fn power_bit_read_at_model_offset() {
    for (device, layout) in [
        ("PBL-000001", StatusLayout::DUAL_PROBE),
        ("PBG-000001", StatusLayout::FULL),
        ("LFS-000001", StatusLayout::MINIMAL),
    ] {
        let mut h = Harness::new();
        let mut engine = h.engine(device);
        assert!(engine.power_known());
        h.feed(&mut engine, &status_reply(layout, true));
        assert!(engine.module_is_on(), "{device}");
    }
}

#[test]
fn pinned_offset_model() {
    let mut h = Harness::new();
    let mut engine = h.engine("PBM-000001");
    let mut frame = status_reply(StatusLayout::DUAL_PROBE, false);
    frame[23] = 1;
    h.feed(&mut engine, &frame);
    assert!(engine.module_is_on());
}

#[test]
fn unknown_model_leaves_power_unknown() {
    let mut h = Harness::new();
    let mut engine = h.engine("XYZ-000001");
    assert!(!engine.power_known());
    h.feed(&mut engine, &status_reply(StatusLayout::FULL, true));
    assert!(!engine.module_is_on());
    assert!(matches!(
        h.sink.events.last(),
        Some(AppEvent::StatusCaptured(Captured::Raw { command_id: 0x0B, .. }))
    ));
    assert_eq!(h.call(&mut engine, "PB.SetVirtualData", json!({})), Err(409));
}

#[test]
fn status_reply_decoded_for_known_model() {
    let mut h = Harness::new();
    let mut engine = h.engine("PBL-000001");
    h.feed(&mut engine, &status_reply(StatusLayout::DUAL_PROBE, true));
    let report = engine.status_report().unwrap();
    assert!(report.module_is_on);
    assert_eq!(report.grill_temp, Some(70));
    assert!(report.is_fahrenheit);

    h.feed(&mut engine, &temperatures_reply(StatusLayout::DUAL_PROBE));
    let temps = engine.temperature_report().unwrap();
    assert_eq!(temps.grill_set_temp, Some(225));
    assert_eq!(temps.p2_temp, None);
}

// ── Scheduler-driven traffic ──────────────────────────────────

#[test]
fn polls_alternate_after_settle() {
    let mut h = Harness::new();
    let config = EngineConfig {
        settle_secs: 3,
        mcu_poll_secs: 1,
        ..EngineConfig::default()
    };
    let mut engine = h.engine_with("PBL-000001", &config);
    h.ticks(&mut engine, 3);
    assert!(h.mcu.frames.is_empty());
    h.ticks(&mut engine, 4);
    assert_eq!(h.mcu.ids(), vec![0x0B, 0x0C, 0x0B, 0x0C]);
}

#[test]
fn every_outbound_command_invalidates_cache() {
    let mut h = Harness::new();
    let config = EngineConfig {
        settle_secs: 0,
        mcu_poll_secs: 1,
        ..EngineConfig::default()
    };
    let mut engine = h.engine_with("PBL-000001", &config);
    h.feed(&mut engine, &status_reply(StatusLayout::DUAL_PROBE, true));
    h.feed(&mut engine, &temperatures_reply(StatusLayout::DUAL_PROBE));
    assert!(!engine.status_snapshot().sc_11.is_empty());

    // Scheduler poll.
    h.ticks(&mut engine, 1);
    assert_eq!(h.mcu.ids(), vec![0x0B]);
    let snap = engine.status_snapshot();
    assert!(snap.sc_11.is_empty());
    assert!(snap.sc_12.is_empty());
    assert!(engine.module_is_on(), "power state outlives the cache");

    let reply = status_reply(StatusLayout::DUAL_PROBE, true);
    h.feed(&mut engine, &reply);
    assert_eq!(engine.status_snapshot().sc_11, hex::encode_upper(&reply));

    // Network notify on link up.
    h.connect(&mut engine);
    assert_eq!(h.mcu.last(), Some(&[0xFE, 0x24, 0x01, 0xFF][..]));
    assert!(engine.status_snapshot().sc_11.is_empty());
}

#[test]
fn push_and_poll_in_one_tick_push_sees_last_reply() {
    let mut h = Harness::new();
    let config = EngineConfig {
        settle_secs: 0,
        mcu_poll_secs: 1,
        ..EngineConfig::default()
    };
    let mut engine = h.engine_with("PBL-000001", &config);
    h.connect(&mut engine);
    h.feed(&mut engine, &status_reply(StatusLayout::DUAL_PROBE, true));
    h.call(&mut engine, "PB.KeepAlive", json!({})).unwrap();
    h.ticks(&mut engine, 1);

    let pushes = h.relay.pushes();
    assert_eq!(pushes.len(), 1);
    assert_eq!(pushes[0]["status"].as_array().unwrap().len(), 1);
    assert!(engine.status_snapshot().sc_11.is_empty());
}

#[test]
fn one_final_push_after_power_down() {
    let mut h = Harness::new();
    let mut engine = h.engine("PBL-000001");
    h.connect(&mut engine);
    h.call(
        &mut engine,
        "PB.SetWifiUpdateFrequency",
        json!({ "fast": 1, "slow": 1 }),
    )
    .unwrap();

    h.ticks(&mut engine, 3);
    assert!(h.relay.pushes().is_empty(), "off from the start");

    h.feed(&mut engine, &status_reply(StatusLayout::DUAL_PROBE, true));
    h.ticks(&mut engine, 2);
    assert_eq!(h.relay.pushes().len(), 2);

    h.feed(&mut engine, &status_reply(StatusLayout::DUAL_PROBE, false));
    h.ticks(&mut engine, 5);
    assert_eq!(h.relay.pushes().len(), 3);
}

#[test]
fn keepalive_switches_to_fast_cadence_then_reverts() {
    let mut h = Harness::new();
    let config = EngineConfig {
        settle_secs: 0,
        mcu_poll_secs: 0,
        watchdog_secs: 4,
        ..EngineConfig::default()
    };
    let mut engine = h.engine_with("PBL-000001", &config);
    h.connect(&mut engine);
    h.feed(&mut engine, &status_reply(StatusLayout::DUAL_PROBE, true));
    h.call(
        &mut engine,
        "PB.SetWifiUpdateFrequency",
        json!({ "fast": 2, "slow": 10 }),
    )
    .unwrap();

    let mut pushed_at = ticks_with_push(&mut h, &mut engine, 1..=20);
    let ka = h.call(&mut engine, "PB.KeepAlive", json!({})).unwrap();
    assert_eq!(ka, json!({ "watchdog": 4 }));
    pushed_at.extend(ticks_with_push(&mut h, &mut engine, 21..=35));

    assert_eq!(pushed_at, vec![10, 20, 21, 23, 25, 35]);
}

/// Tick numbers in `range` that produced a push.
fn ticks_with_push(
    h: &mut Harness,
    engine: &mut Engine,
    range: std::ops::RangeInclusive<usize>,
) -> Vec<usize> {
    let mut pushed = Vec::new();
    for t in range {
        let before = h.relay.pushes().len();
        h.ticks(engine, 1);
        if h.relay.pushes().len() > before {
            pushed.push(t);
        }
    }
    pushed
}

#[test]
fn push_carries_p_state() {
    let mut h = Harness::new();
    let mut engine = h.engine("PBL-000001");
    h.connect(&mut engine);
    h.feed(&mut engine, &status_reply(StatusLayout::DUAL_PROBE, true));

    assert_eq!(h.relay(&mut engine, r#"{"setPState":"cooking"}"#), None);
    assert_eq!(engine.p_state(), Some("cooking"));
    h.call(&mut engine, "PB.KeepAlive", json!({})).unwrap();
    h.ticks(&mut engine, 1);
    assert_eq!(h.relay.pushes().last().unwrap()["pState"], "cooking");

    h.relay(&mut engine, r#"{"setPState":""}"#);
    assert_eq!(engine.p_state(), None);
}

// ── Relay link ────────────────────────────────────────────────

#[test]
fn link_changes_notify_controller() {
    let mut h = Harness::new();
    let mut engine = h.engine("PBL-000001");
    assert_eq!(engine.relay_state(), LinkState::Disconnected);

    assert!(engine.begin_relay_connect());
    assert!(!engine.begin_relay_connect(), "attempt already in flight");
    engine.relay_connected(&mut h.ports());
    assert_eq!(engine.relay_state(), LinkState::Connected);
    assert_eq!(h.mcu.last(), Some(&[0xFE, 0x24, 0x01, 0xFF][..]));

    engine.relay_disconnected(&mut h.ports());
    assert_eq!(h.mcu.last(), Some(&[0xFE, 0x24, 0x00, 0xFF][..]));
    engine.relay_disconnected(&mut h.ports());
    assert_eq!(h.mcu.frames.len(), 2);
    assert!(engine.begin_relay_connect());
}

#[test]
fn replies_dropped_while_disconnected() {
    let mut h = Harness::new();
    let mut engine = h.engine("PBL-000001");
    assert_eq!(h.relay(&mut engine, r#"{"id":1,"method":"RPC.Ping"}"#), None);
    assert!(h.relay.sent.is_empty());
}

#[test]
fn malformed_relay_messages_get_protocol_errors() {
    let mut h = Harness::new();
    let mut engine = h.engine("PBL-000001");
    h.connect(&mut engine);

    let reply = h.relay(&mut engine, "not json").unwrap();
    assert_eq!(reply["id"], json!(null));
    assert_eq!(reply["src"], "PBL-000001");
    assert_eq!(reply["error"]["code"], -32600);

    let reply = h.relay(&mut engine, "[1,2,3]").unwrap();
    assert_eq!(reply["error"]["code"], -32600);

    let reply = h.relay(&mut engine, r#"{"id":5}"#).unwrap();
    assert_eq!(reply["id"], 5);
    assert_eq!(reply["error"]["code"], -32600);

    let reply = h.relay(&mut engine, r#"{"id":"x","method":"RPC.Ping"}"#).unwrap();
    assert_eq!(reply["id"], "x");
    assert_eq!(reply["error"]["code"], -32600);

    let reply = h
        .relay(&mut engine, r#"{"id":6,"method":"RPC.Ping","params":[1]}"#)
        .unwrap();
    assert_eq!(reply["error"]["code"], 400);
}

#[test]
fn relay_requests_are_correlated() {
    let mut h = Harness::new();
    let mut engine = h.engine("PBL-000001");
    h.connect(&mut engine);

    let reply = h
        .relay(&mut engine, r#"{"id":8,"method":"RPC.Ping","app_id":"phone-1"}"#)
        .unwrap();
    assert_eq!(reply, json!({ "id": 8, "src": "PBL-000001", "app_id": "phone-1", "result": {} }));

    let reply = h.relay(&mut engine, r#"{"id":9,"method":"PB.Nope"}"#).unwrap();
    assert_eq!(reply["id"], 9);
    assert_eq!(reply["error"]["code"], 404);
    assert!(reply.get("result").is_none());
}
