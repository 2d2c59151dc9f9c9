//! Fuzz target: inbound relay documents
//!
//! Arbitrary text through `parse_inbound`; every classification must
//! render a reply without panicking.
//!
//! cargo fuzz run fuzz_inbound

#![no_main]

use libfuzzer_sys::fuzz_target;
use pelletlink::rpc::message::{Inbound, parse_inbound, reply_text};
use serde_json::json;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    match parse_inbound(text) {
        Inbound::Malformed { reply, error } => {
            assert!(reply_text(&reply, "PBL-FUZZ01", &Err(error)).is_ok());
        }
        Inbound::Request(req) => {
            assert!(reply_text(&req.context(), "PBL-FUZZ01", &Ok(json!({}))).is_ok());
        }
        Inbound::SetPState(_) => {}
    }
});
