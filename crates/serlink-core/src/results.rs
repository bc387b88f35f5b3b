//! Results image exchanged after both data phases.

use crate::error::FrameError;

/// Wire length of the results image.
pub const RESULTS_LEN: usize = 44;

/// Per-peer session statistics, exchanged as a fixed 44-byte little-endian
/// image once both data phases have completed.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[must_use]
pub struct Results {
    pub total_received_bytes: u64,
    pub received_count: u32,
    pub error_count: u32,
    pub retransmit_count: u32,
    pub elapsed_seconds: f64,
    pub throughput_mb_per_s: f64,
    pub chars_per_s: f64,
}

impl Results {
    #[must_use = "serialization produces a new array without modifying the results"]
    pub fn serialize(&self) -> [u8; RESULTS_LEN] {
        let mut out = [0u8; RESULTS_LEN];
        out[0..8].copy_from_slice(&self.total_received_bytes.to_le_bytes());
        out[8..12].copy_from_slice(&self.received_count.to_le_bytes());
        out[12..16].copy_from_slice(&self.error_count.to_le_bytes());
        out[16..20].copy_from_slice(&self.retransmit_count.to_le_bytes());
        out[20..28].copy_from_slice(&self.elapsed_seconds.to_le_bytes());
        out[28..36].copy_from_slice(&self.throughput_mb_per_s.to_le_bytes());
        out[36..44].copy_from_slice(&self.chars_per_s.to_le_bytes());
        out
    }

    #[must_use = "parsing may fail; check the Result"]
    pub fn parse(raw: &[u8]) -> Result<Self, FrameError> {
        if raw.len() != RESULTS_LEN {
            return Err(FrameError::LengthMismatch {
                expected: RESULTS_LEN,
                actual: raw.len(),
            });
        }
        Ok(Self {
            total_received_bytes: u64::from_le_bytes(
                raw[0..8].try_into().expect("slice is 8 bytes"),
            ),
            received_count: u32::from_le_bytes(raw[8..12].try_into().expect("slice is 4 bytes")),
            error_count: u32::from_le_bytes(raw[12..16].try_into().expect("slice is 4 bytes")),
            retransmit_count: u32::from_le_bytes(raw[16..20].try_into().expect("slice is 4 bytes")),
            elapsed_seconds: f64::from_le_bytes(raw[20..28].try_into().expect("slice is 8 bytes")),
            throughput_mb_per_s: f64::from_le_bytes(
                raw[28..36].try_into().expect("slice is 8 bytes"),
            ),
            chars_per_s: f64::from_le_bytes(raw[36..44].try_into().expect("slice is 8 bytes")),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let results = Results {
            total_received_bytes: 163_840,
            received_count: 10,
            error_count: 1,
            retransmit_count: 2,
            elapsed_seconds: 1.5,
            throughput_mb_per_s: 0.104,
            chars_per_s: 109_226.7,
        };
        assert_eq!(Results::parse(&results.serialize()).unwrap(), results);
    }

    #[test]
    fn image_is_44_bytes() {
        assert_eq!(Results::default().serialize().len(), RESULTS_LEN);
    }

    #[test]
    fn parse_rejects_wrong_length() {
        assert!(matches!(
            Results::parse(&[0u8; 43]),
            Err(FrameError::LengthMismatch { .. })
        ));
    }
}
