//! Bootstrap settings image.
//!
//! Sent once by the initiator at session start as a bare 16-byte record —
//! no SOF/EOF framing, the line is trusted to be quiet at this point.

use crate::constants::PROTOCOL_VERSION;
use crate::error::FrameError;

/// Wire length of the settings image.
pub const SETTINGS_LEN: usize = 16;

/// Session parameters proposed by the initiator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub struct Settings {
    pub protocol_version: u32,
    /// Payload bytes per data frame.
    pub payload_size: u32,
    /// Total frames each direction will carry.
    pub frame_count: u32,
    pub reserved: u32,
}

impl Settings {
    /// Settings for the current protocol version.
    pub fn new(payload_size: u32, frame_count: u32) -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION,
            payload_size,
            frame_count,
            reserved: 0,
        }
    }

    #[must_use = "serialization produces a new array without modifying the settings"]
    pub fn serialize(&self) -> [u8; SETTINGS_LEN] {
        let mut out = [0u8; SETTINGS_LEN];
        out[0..4].copy_from_slice(&self.protocol_version.to_le_bytes());
        out[4..8].copy_from_slice(&self.payload_size.to_le_bytes());
        out[8..12].copy_from_slice(&self.frame_count.to_le_bytes());
        out[12..16].copy_from_slice(&self.reserved.to_le_bytes());
        out
    }

    #[must_use = "parsing may fail; check the Result"]
    pub fn parse(raw: &[u8]) -> Result<Self, FrameError> {
        if raw.len() != SETTINGS_LEN {
            return Err(FrameError::LengthMismatch {
                expected: SETTINGS_LEN,
                actual: raw.len(),
            });
        }
        Ok(Self {
            protocol_version: u32::from_le_bytes(raw[0..4].try_into().expect("slice is 4 bytes")),
            payload_size: u32::from_le_bytes(raw[4..8].try_into().expect("slice is 4 bytes")),
            frame_count: u32::from_le_bytes(raw[8..12].try_into().expect("slice is 4 bytes")),
            reserved: u32::from_le_bytes(raw[12..16].try_into().expect("slice is 4 bytes")),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let settings = Settings::new(4096, 1000);
        assert_eq!(settings.protocol_version, PROTOCOL_VERSION);
        assert_eq!(Settings::parse(&settings.serialize()).unwrap(), settings);
    }

    #[test]
    fn layout_is_little_endian() {
        let wire = Settings::new(0x0102, 3).serialize();
        assert_eq!(&wire[0..4], &[4, 0, 0, 0]);
        assert_eq!(&wire[4..8], &[0x02, 0x01, 0, 0]);
        assert_eq!(&wire[8..12], &[3, 0, 0, 0]);
        assert_eq!(&wire[12..16], &[0, 0, 0, 0]);
    }

    #[test]
    fn parse_rejects_wrong_length() {
        assert!(matches!(
            Settings::parse(&[0u8; 15]),
            Err(FrameError::LengthMismatch {
                expected: 16,
                actual: 15
            })
        ));
    }
}
