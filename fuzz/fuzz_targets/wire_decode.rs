//! Fuzz target: the wire decoder must never panic on arbitrary input

#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Malformed frames must come back as errors, not panics; well-formed
    // frames must re-encode to the same bytes
    if let Ok(packet) = murmur_wire::decode(data) {
        let encoded = murmur_wire::encode(&packet).expect("decoded packet must re-encode");
        assert_eq!(encoded, data);
    }
});
