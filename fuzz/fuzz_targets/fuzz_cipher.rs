//! Fuzz target: credential codec and password check
//!
//! Decodes arbitrary ciphertext under the seed key and the bucket keys,
//! and runs the password check with arbitrary `psw` text. Nothing may
//! panic, and a password must always verify against its own encoding.
//!
//! cargo fuzz run fuzz_cipher

#![no_main]

use libfuzzer_sys::fuzz_target;
use pelletlink::adapters::mem_store::MemStore;
use pelletlink::rpc::auth::{Credentials, client_psw, open_secret};
use pelletlink::rpc::cipher::{SEED_KEY, decode, derive_key, time_bucket};

fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }
    let (head, rest) = data.split_at(2);
    let uptime = f64::from(u16::from_le_bytes([head[0], head[1]]));

    let _ = decode(rest, &SEED_KEY);
    let _ = decode(rest, &derive_key(&SEED_KEY, time_bucket(uptime)));
    let _ = open_secret(&String::from_utf8_lossy(rest));

    let mid = rest.len() / 2;
    let (password, psw) = rest.split_at(mid);
    if password.is_empty() {
        return;
    }
    let mut store = MemStore::new();
    let mut creds = Credentials::default();
    if creds.set_password(&mut store, password).is_err() {
        return;
    }
    let _ = creds.verify(Some(&String::from_utf8_lossy(psw)), uptime);
    assert!(creds.verify(Some(&client_psw(password, uptime)), uptime).is_ok());
});
