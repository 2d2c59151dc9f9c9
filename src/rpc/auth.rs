//! Device password check and credential persistence.
//!
//! Clients prove knowledge of the device password by sending it
//! codec-encoded under the *time-bucket* key as `psw`:
//!
//! 1. Client reads the device uptime (`PB.GetTime`)
//! 2. Client sends `hex(encode(password, timed_key(uptime)))` as `psw`
//! 3. Device decodes with the key of the current bucket, then the
//!    previous one, and compares against its stored password
//!
//! Secrets at rest (device password, Wi-Fi passphrase) are kept only in
//! codec-transformed form under [`SEED_KEY`], re-encoded with fresh filler
//! every time they are written.

use log::{info, warn};

use crate::app::ports::{StorageError, StoragePort};

use super::cipher::{self, SEED_KEY};

const AUTH_NS: &str = "auth";
const PSW_KEY: &str = "psw";
const WIFI_NS: &str = "wifi";
const SSID_KEY: &str = "ssid";
const PASS_KEY: &str = "pass";
const DEV_NS: &str = "dev";
const NAME_KEY: &str = "name";

/// Scratch buffer for reading one stored value.
const READ_BUF: usize = 256;

/// Longest accepted plaintext secret.
pub const MAX_SECRET_LEN: usize = 64;

/// Longest accepted device name (characters).
pub const MAX_NAME_LEN: usize = 32;

/// Longest accepted SSID (bytes).
pub const MAX_SSID_LEN: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    /// A password is set but no `psw` was supplied.
    Missing,
    /// `psw` is not a hex string.
    Malformed,
    /// `psw` decodes to something else under both accepted keys.
    Mismatch,
}

impl core::fmt::Display for AuthError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Missing => write!(f, "password required"),
            Self::Malformed => write!(f, "password field is not hex"),
            Self::Mismatch => write!(f, "password mismatch"),
        }
    }
}

/// Credentials held by the engine, mirrored in storage.
#[derive(Debug, Default, Clone)]
pub struct Credentials {
    /// Device password, encoded under [`SEED_KEY`].
    password: Option<Vec<u8>>,
    wifi_ssid: Option<String>,
    /// Wi-Fi passphrase, encoded under [`SEED_KEY`].
    wifi_pass: Option<Vec<u8>>,
    name: Option<String>,
}

impl Credentials {
    /// Load whatever is stored; missing or unreadable keys stay unset.
    pub fn load(store: &dyn StoragePort) -> Self {
        let creds = Self {
            password: read_value(store, AUTH_NS, PSW_KEY).filter(|v| !v.is_empty()),
            wifi_ssid: read_value(store, WIFI_NS, SSID_KEY).and_then(|v| String::from_utf8(v).ok()),
            wifi_pass: read_value(store, WIFI_NS, PASS_KEY),
            name: read_value(store, DEV_NS, NAME_KEY).and_then(|v| String::from_utf8(v).ok()),
        };
        info!(
            "Auth: loaded (password={}, wifi={}, name={:?})",
            creds.password.is_some(),
            creds.wifi_ssid.is_some(),
            creds.name
        );
        creds
    }

    pub fn has_password(&self) -> bool {
        self.password.is_some()
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn wifi_ssid(&self) -> Option<&str> {
        self.wifi_ssid.as_deref()
    }

    /// Check a client-supplied `psw` at the given uptime.
    ///
    /// Passes unconditionally while no password is set.
    pub fn verify(&self, psw: Option<&str>, uptime_secs: f64) -> Result<(), AuthError> {
        let Some(stored) = &self.password else {
            return Ok(());
        };
        let psw = psw.ok_or(AuthError::Missing)?;
        let encoded = hex::decode(psw).map_err(|_| AuthError::Malformed)?;
        let expected = cipher::decode(stored, &SEED_KEY);

        let bucket = cipher::time_bucket(uptime_secs);
        let accepted = [Some(bucket), bucket.checked_sub(1)];
        for b in accepted.into_iter().flatten() {
            let candidate = cipher::decode(&encoded, &cipher::derive_key(&SEED_KEY, b));
            if ct_eq(&candidate, &expected) {
                return Ok(());
            }
        }
        warn!("Auth: password mismatch at bucket {}", bucket);
        Err(AuthError::Mismatch)
    }

    /// Replace the device password. An empty password clears it.
    pub fn set_password(
        &mut self,
        store: &mut dyn StoragePort,
        plain: &[u8],
    ) -> Result<(), StorageError> {
        if plain.is_empty() {
            store.delete(AUTH_NS, PSW_KEY)?;
            self.password = None;
            info!("Auth: device password cleared");
            return Ok(());
        }
        let sealed = cipher::encode(plain, &SEED_KEY);
        store.write(AUTH_NS, PSW_KEY, &sealed)?;
        self.password = Some(sealed);
        info!("Auth: device password updated");
        Ok(())
    }

    pub fn set_wifi(
        &mut self,
        store: &mut dyn StoragePort,
        ssid: &str,
        pass: &[u8],
    ) -> Result<(), StorageError> {
        let sealed = cipher::encode(pass, &SEED_KEY);
        store.write(WIFI_NS, SSID_KEY, ssid.as_bytes())?;
        store.write(WIFI_NS, PASS_KEY, &sealed)?;
        self.wifi_ssid = Some(ssid.to_string());
        self.wifi_pass = Some(sealed);
        info!("Auth: wifi credentials updated (ssid={})", ssid);
        Ok(())
    }

    /// Stored Wi-Fi passphrase in plaintext, for the network layer only.
    pub fn wifi_pass(&self) -> Option<Vec<u8>> {
        self.wifi_pass.as_ref().map(|p| cipher::decode(p, &SEED_KEY))
    }

    pub fn set_name(&mut self, store: &mut dyn StoragePort, name: &str) -> Result<(), StorageError> {
        store.write(DEV_NS, NAME_KEY, name.as_bytes())?;
        self.name = Some(name.to_string());
        info!("Auth: device name set to {:?}", name);
        Ok(())
    }
}

/// Decode a secret sent under the seed key (`newPassword`, Wi-Fi `pass`).
pub fn open_secret(hex_str: &str) -> Result<Vec<u8>, &'static str> {
    let encoded = hex::decode(hex_str).map_err(|_| "not a hex string")?;
    let plain = cipher::decode(&encoded, &SEED_KEY);
    if plain.len() > MAX_SECRET_LEN {
        return Err("secret too long");
    }
    Ok(plain)
}

/// What a client sends as `psw` for `password` at `uptime_secs`.
pub fn client_psw(password: &[u8], uptime_secs: f64) -> String {
    hex::encode(cipher::encode(password, &cipher::timed_key(uptime_secs)))
}

/// What a client sends as `newPassword` / Wi-Fi `pass`.
pub fn client_secret(plain: &[u8]) -> String {
    hex::encode(cipher::encode(plain, &SEED_KEY))
}

pub fn validate_name(name: &str) -> Result<(), &'static str> {
    if name.is_empty() {
        return Err("name must not be empty");
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err("name too long");
    }
    if name.trim() != name {
        return Err("name must not start or end with whitespace");
    }
    if name.chars().any(char::is_control) {
        return Err("name must not contain control characters");
    }
    Ok(())
}

pub fn validate_ssid(ssid: &str) -> Result<(), &'static str> {
    if ssid.is_empty() || ssid.len() > MAX_SSID_LEN {
        return Err("ssid must be 1..=32 bytes");
    }
    Ok(())
}

fn read_value(store: &dyn StoragePort, namespace: &str, key: &str) -> Option<Vec<u8>> {
    let mut buf = [0u8; READ_BUF];
    match store.read(namespace, key, &mut buf) {
        Ok(n) => Some(buf[..n].to_vec()),
        Err(StorageError::NotFound) => None,
        Err(e) => {
            warn!("Auth: reading {}::{} failed: {}", namespace, key, e);
            None
        }
    }
}

/// Length-revealing but otherwise constant-time comparison.
fn ct_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
