//! Fuzz target: `Framer::ingest`
//!
//! Feeds arbitrary bytes, split at a fuzzer-chosen point, into the
//! streaming framer and checks that every emitted frame is delimited,
//! carries no interior end marker, and that the carry-over buffer stays
//! within its cap.
//!
//! cargo fuzz run fuzz_framer

#![no_main]

use libfuzzer_sys::fuzz_target;
use pelletlink::uart::{Framer, RAW_BUFFER_CAP};

fuzz_target!(|data: &[u8]| {
    let Some((&split, rest)) = data.split_first() else {
        return;
    };
    let split = usize::from(split).min(rest.len());
    let (a, b) = rest.split_at(split);

    let mut framer = Framer::new();
    for chunk in [a, b] {
        for frame in framer.ingest(chunk) {
            let bytes = frame.as_bytes();
            assert!(bytes.len() >= 2);
            assert_eq!(bytes[0], 0xFE);
            assert_eq!(bytes[bytes.len() - 1], 0xFF);
            assert!(!bytes[1..bytes.len() - 1].contains(&0xFF));
        }
        assert!(framer.buffered() <= RAW_BUFFER_CAP);
    }

    framer.reset();
    assert_eq!(framer.buffered(), 0);
});
