//! Time-keyed credential codec.
//!
//! A running XOR stream cipher whose key byte at the next position is
//! re-mixed with every ciphertext byte. It only obscures credential fields
//! (`psw`, `newPassword`, Wi-Fi `pass`); frames on the UART are never
//! passed through it.
//!
//! ```text
//! encode:  [filler × N][0xFF][data]  ──xor/mutate──▶  ciphertext
//! decode:  ciphertext  ──xor/mutate──▶  [filler][0xFF][data]  ──strip──▶  data
//! ```
//!
//! Working keys are derived per call from [`SEED_KEY`] and a 10-second
//! uptime bucket; nothing about the key is ever stored.

use rand::Rng;

/// Working key width.
pub const KEY_LEN: usize = 8;

pub type CipherKey = [u8; KEY_LEN];

/// Fixed seed shared with the companion app.
pub const SEED_KEY: CipherKey = [0x8F, 0x80, 0x19, 0xCF, 0x77, 0x6C, 0xFE, 0xB7];

/// Filler bytes prepended by [`encode`].
pub const PADDING_LEN: usize = 16;

/// Separates filler from data. Filler bytes never take this value.
pub const DATA_MARKER: u8 = 0xFF;

/// Grace offset before the first bucket boundary.
const BUCKET_GRACE_SECS: f64 = 5.0;

/// Bucket width.
const BUCKET_SECS: f64 = 10.0;

/// `floor(max(uptime - 5, 0) / 10)`.
pub fn time_bucket(uptime_secs: f64) -> u64 {
    ((uptime_secs - BUCKET_GRACE_SECS).max(0.0) / BUCKET_SECS).floor() as u64
}

/// Derive the working key for `bucket`.
///
/// Pulls one seed byte per step at `n mod remaining`, folds it into `n`,
/// and appends `byte ^ n`; the last remaining byte is appended as is.
pub fn derive_key(seed: &CipherKey, bucket: u64) -> CipherKey {
    let mut pool: Vec<u8> = seed.to_vec();
    let mut out = [0u8; KEY_LEN];
    let mut n = bucket;
    let mut i = 0;
    while pool.len() > 1 {
        let v = pool.remove((n % pool.len() as u64) as usize);
        out[i] = (u64::from(v) ^ n) as u8;
        n = n.wrapping_mul(u64::from(v)).wrapping_add(u64::from(v)) & 0xFF;
        i += 1;
    }
    out[i] = pool[0];
    out
}

/// Working key for the bucket containing `uptime_secs`.
pub fn timed_key(uptime_secs: f64) -> CipherKey {
    derive_key(&SEED_KEY, time_bucket(uptime_secs))
}

#[derive(Clone, Copy)]
enum Direction {
    Encode,
    Decode,
}

/// XOR `data` against a self-mutating copy of `key`.
///
/// After byte `i`, key slot `(i + 1) % 8` becomes
/// `(slot ^ ciphertext[i]) + i` (mod 256), in both directions.
fn run(data: &[u8], key: &CipherKey, direction: Direction) -> Vec<u8> {
    let mut key = *key;
    data.iter()
        .enumerate()
        .map(|(i, &b)| {
            let out = b ^ key[i % KEY_LEN];
            let cipher_byte = match direction {
                Direction::Encode => out,
                Direction::Decode => b,
            };
            let next = (i + 1) % KEY_LEN;
            key[next] = (key[next] ^ cipher_byte).wrapping_add(i as u8);
            out
        })
        .collect()
}

/// Symmetric entry point: encodes with `padding_len` filler bytes when
/// `padding_len > 0`, otherwise returns the raw decoded stream (filler
/// and marker included).
pub fn transform(data: &[u8], key: &CipherKey, padding_len: usize) -> Vec<u8> {
    if padding_len > 0 {
        encode_with(data, key, padding_len, &mut rand::thread_rng())
    } else {
        run(data, key, Direction::Decode)
    }
}

/// Encode with [`PADDING_LEN`] random filler bytes.
pub fn encode(data: &[u8], key: &CipherKey) -> Vec<u8> {
    encode_with(data, key, PADDING_LEN, &mut rand::thread_rng())
}

/// Encode with `padding_len` filler bytes drawn from `rng` (0..=254).
pub fn encode_with<R: Rng + ?Sized>(
    data: &[u8],
    key: &CipherKey,
    padding_len: usize,
    rng: &mut R,
) -> Vec<u8> {
    let filler: Vec<u8> = (0..padding_len).map(|_| rng.gen_range(0..DATA_MARKER)).collect();
    encode_with_filler(data, key, &filler)
}

/// Encode with caller-chosen filler. Filler must not contain [`DATA_MARKER`].
pub fn encode_with_filler(data: &[u8], key: &CipherKey, filler: &[u8]) -> Vec<u8> {
    debug_assert!(!filler.contains(&DATA_MARKER));
    let mut plain = Vec::with_capacity(filler.len() + 1 + data.len());
    plain.extend_from_slice(filler);
    plain.push(DATA_MARKER);
    plain.extend_from_slice(data);
    run(&plain, key, Direction::Encode)
}

/// Decode and drop everything up to and including the first marker.
///
/// Input without a marker decodes to the raw stream unchanged.
pub fn decode(data: &[u8], key: &CipherKey) -> Vec<u8> {
    let mut raw = run(data, key, Direction::Decode);
    if let Some(pos) = raw.iter().position(|&b| b == DATA_MARKER) {
        raw.drain(..=pos);
    }
    raw
}
