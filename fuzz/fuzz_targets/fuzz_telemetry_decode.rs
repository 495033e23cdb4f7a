//! Fuzz target: `telemetry::decode`
//!
//! Arbitrary payloads must either be rejected as too short or decode to
//! the bytes at the fixed offsets.  Never a panic.
//!
//! cargo fuzz run fuzz_telemetry_decode

#![no_main]

use autooxy::error::DecodeError;
use autooxy::telemetry::{decode, hex_dump, MIN_FRAME_LEN};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    match decode(data, 0) {
        Ok(r) => {
            assert!(data.len() >= MIN_FRAME_LEN);
            assert_eq!(r.heart_rate_bpm(), data[3]);
            assert_eq!(r.spo2_percent(), data[4]);
        }
        Err(DecodeError::TooShort { len }) => {
            assert_eq!(len, data.len());
            assert!(len < MIN_FRAME_LEN);
        }
    }
    let _ = hex_dump(data);
});
