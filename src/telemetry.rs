//! Oximeter notification decoder.
//!
//! The peripheral streams fixed-layout frames on its notify characteristic.
//! Only two bytes matter to the controller:
//!
//! ```text
//!  0      1      2      3          4
//! ┌──────┬──────┬──────┬──────────┬──────────┬─ ─ ─
//! │ rsvd │ rsvd │ rsvd │ HR (bpm) │ SpO2 (%) │ vendor trailer…
//! └──────┴──────┴──────┴──────────┴──────────┴─ ─ ─
//! ```
//!
//! No plausibility checks are applied: an SpO2 byte of 127 (the vendor's
//! "finger out" marker) decodes like any other value.

use core::fmt::Write as _;

use crate::error::DecodeError;

/// Shortest payload that carries a reading.
pub const MIN_FRAME_LEN: usize = 5;

const HEART_RATE_OFFSET: usize = 3;
const SPO2_OFFSET: usize = 4;

/// One decoded (SpO2, heart-rate) sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reading {
    spo2_percent: u8,
    heart_rate_bpm: u8,
    received_at_ms: u64,
}

impl Reading {
    pub fn spo2_percent(&self) -> u8 {
        self.spo2_percent
    }

    pub fn heart_rate_bpm(&self) -> u8 {
        self.heart_rate_bpm
    }

    /// Monotonic receipt time (milliseconds since boot).
    pub fn received_at_ms(&self) -> u64 {
        self.received_at_ms
    }
}

/// Decode a raw notification payload received at `now_ms`.
pub fn decode(bytes: &[u8], now_ms: u64) -> Result<Reading, DecodeError> {
    if bytes.len() < MIN_FRAME_LEN {
        return Err(DecodeError::TooShort { len: bytes.len() });
    }
    Ok(Reading {
        spo2_percent: bytes[SPO2_OFFSET],
        heart_rate_bpm: bytes[HEART_RATE_OFFSET],
        received_at_ms: now_ms,
    })
}

/// Render a payload as space-separated hex for the debug log.
pub fn hex_dump(bytes: &[u8]) -> heapless::String<96> {
    let mut out = heapless::String::new();
    for b in bytes {
        // Long frames are cut off rather than failing the log line.
        if write!(out, "{b:02X} ").is_err() {
            break;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_fixed_offsets() {
        let r = decode(&[0x81, 0x00, 0x00, 72, 95], 1234).unwrap();
        assert_eq!(r.heart_rate_bpm(), 72);
        assert_eq!(r.spo2_percent(), 95);
        assert_eq!(r.received_at_ms(), 1234);
    }

    #[test]
    fn ignores_trailing_bytes() {
        let r = decode(&[0, 0, 0, 60, 99, 0xFF, 0xEE, 0xDD], 0).unwrap();
        assert_eq!((r.heart_rate_bpm(), r.spo2_percent()), (60, 99));
    }

    #[test]
    fn accepts_implausible_values() {
        let r = decode(&[0, 0, 0, 255, 127], 0).unwrap();
        assert_eq!(r.spo2_percent(), 127);
        assert_eq!(r.heart_rate_bpm(), 255);
    }

    #[test]
    fn rejects_short_frames() {
        for len in 0..MIN_FRAME_LEN {
            let buf = [0xAAu8; MIN_FRAME_LEN];
            assert_eq!(decode(&buf[..len], 0), Err(DecodeError::TooShort { len }));
        }
    }

    #[test]
    fn hex_dump_formats_bytes() {
        assert_eq!(hex_dump(&[0x00, 0xA0, 0x7C]).as_str(), "00 A0 7C ");
        assert_eq!(hex_dump(&[]).as_str(), "");
    }

    #[test]
    fn hex_dump_truncates_long_frames() {
        let dump = hex_dump(&[0xAB; 64]);
        assert_eq!(dump.len(), 96);
    }
}
