//! Data frame wire format.
//!
//! ```text
//! | SOF 0x02 | frame_number u32 LE | window_size u16 LE | checksum u16 LE | payload[N] | EOF 0x03 |
//! ```
//!
//! Total length is `N + 10`. The frame length is fixed by the payload size
//! agreed in the bootstrap exchange, so parsing never scans for delimiter
//! bytes; the SOF/EOF pair is a boundary check, not a search token.

use crate::checksum;
use crate::constants::{DATA_OVERHEAD, EOF, SOF_DATA};
use crate::error::FrameError;

/// A data frame carrying one fixed-size payload record.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub struct DataFrame {
    /// Zero-based, contiguous frame number within the session.
    pub frame_number: u32,
    /// Sender's current window size, carried for diagnostics.
    pub window_size: u16,
    /// XOR-rotate checksum over the payload only.
    pub checksum: u16,
    pub payload: Vec<u8>,
}

impl DataFrame {
    /// Build a frame, computing the payload checksum.
    pub fn new(frame_number: u32, window_size: u16, payload: Vec<u8>) -> Self {
        let checksum = checksum::xor_rotate(&payload);
        Self {
            frame_number,
            window_size,
            checksum,
            payload,
        }
    }

    /// Wire length of a data frame carrying `payload_size` bytes.
    pub const fn wire_len(payload_size: usize) -> usize {
        payload_size + DATA_OVERHEAD
    }

    /// Serialize into a newly allocated buffer.
    #[must_use = "serialization produces a new Vec without modifying the frame"]
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::wire_len(self.payload.len()));
        encode_data_frame(
            &mut out,
            self.frame_number,
            self.window_size,
            self.checksum,
            &self.payload,
        );
        out
    }

    /// Parse a data frame from exactly one wire record.
    ///
    /// Validates structure only (length, SOF, EOF). Checksum verification is
    /// a separate step so the caller can distinguish a framing failure from
    /// a corrupted payload.
    #[must_use = "parsing may fail; check the Result"]
    pub fn parse(raw: &[u8]) -> Result<Self, FrameError> {
        if raw.len() < DATA_OVERHEAD {
            return Err(FrameError::TooShort {
                min: DATA_OVERHEAD,
                actual: raw.len(),
            });
        }
        if raw[0] != SOF_DATA {
            return Err(FrameError::InvalidSof(raw[0]));
        }
        if raw[raw.len() - 1] != EOF {
            return Err(FrameError::InvalidEof(raw[raw.len() - 1]));
        }

        let frame_number = u32::from_le_bytes(raw[1..5].try_into().expect("slice is 4 bytes"));
        let window_size = u16::from_le_bytes(raw[5..7].try_into().expect("slice is 2 bytes"));
        let checksum = u16::from_le_bytes(raw[7..9].try_into().expect("slice is 2 bytes"));
        let payload = raw[9..raw.len() - 1].to_vec();

        Ok(Self {
            frame_number,
            window_size,
            checksum,
            payload,
        })
    }

    /// Whether the stored checksum matches the payload.
    pub fn verify_checksum(&self) -> bool {
        checksum::verify(&self.payload, self.checksum)
    }
}

/// Append one data frame's wire image to `out`.
///
/// Shared by [`DataFrame::serialize`] and the burst formatter, which packs
/// several frames back-to-back into a single write without cloning payloads.
pub fn encode_data_frame(
    out: &mut Vec<u8>,
    frame_number: u32,
    window_size: u16,
    checksum: u16,
    payload: &[u8],
) {
    out.reserve(DataFrame::wire_len(payload.len()));
    out.push(SOF_DATA);
    out.extend_from_slice(&frame_number.to_le_bytes());
    out.extend_from_slice(&window_size.to_le_bytes());
    out.extend_from_slice(&checksum.to_le_bytes());
    out.extend_from_slice(payload);
    out.push(EOF);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialize_layout() {
        let frame = DataFrame::new(0x0403_0201, 16, vec![0xAA, 0xBB]);
        let wire = frame.serialize();

        assert_eq!(wire.len(), DataFrame::wire_len(2));
        assert_eq!(wire[0], SOF_DATA);
        assert_eq!(&wire[1..5], &[0x01, 0x02, 0x03, 0x04]);
        assert_eq!(&wire[5..7], &[0x10, 0x00]);
        assert_eq!(&wire[9..11], &[0xAA, 0xBB]);
        assert_eq!(wire[11], EOF);
    }

    #[test]
    fn parse_serialize_roundtrip() {
        let frame = DataFrame::new(7, 32, (0..16u8).collect());
        let parsed = DataFrame::parse(&frame.serialize()).unwrap();
        assert_eq!(parsed, frame);
        assert!(parsed.verify_checksum());
    }

    #[test]
    fn zero_payload_is_ten_bytes() {
        let frame = DataFrame::new(0, 4, Vec::new());
        let wire = frame.serialize();
        assert_eq!(wire.len(), 10);
        assert_eq!(frame.checksum, 0);
        assert_eq!(DataFrame::parse(&wire).unwrap(), frame);
    }

    #[test]
    fn parse_too_short() {
        assert_eq!(
            DataFrame::parse(&[SOF_DATA; 5]),
            Err(FrameError::TooShort { min: 10, actual: 5 })
        );
    }

    #[test]
    fn parse_wrong_sof() {
        let mut wire = DataFrame::new(1, 4, vec![0; 4]).serialize();
        wire[0] = 0x7F;
        assert_eq!(DataFrame::parse(&wire), Err(FrameError::InvalidSof(0x7F)));
    }

    #[test]
    fn parse_wrong_eof() {
        let mut wire = DataFrame::new(1, 4, vec![0; 4]).serialize();
        let last = wire.len() - 1;
        wire[last] = 0x00;
        assert_eq!(DataFrame::parse(&wire), Err(FrameError::InvalidEof(0x00)));
    }

    #[test]
    fn corrupted_payload_fails_checksum_not_parse() {
        let mut wire = DataFrame::new(5, 16, (0..32u8).collect()).serialize();
        wire[12] ^= 0x01;
        let parsed = DataFrame::parse(&wire).expect("structure is intact");
        assert!(!parsed.verify_checksum());
    }

    #[test]
    fn burst_encoding_matches_individual_frames() {
        let a = DataFrame::new(0, 16, vec![1, 2, 3]);
        let b = DataFrame::new(1, 16, vec![4, 5, 6]);

        let mut burst = Vec::new();
        encode_data_frame(&mut burst, 0, 16, a.checksum, &a.payload);
        encode_data_frame(&mut burst, 1, 16, b.checksum, &b.payload);

        let mut expected = a.serialize();
        expected.extend_from_slice(&b.serialize());
        assert_eq!(burst, expected);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn arbitrary_frame() -> impl Strategy<Value = DataFrame> {
        (
            any::<u32>(),
            any::<u16>(),
            proptest::collection::vec(any::<u8>(), 0..256),
        )
            .prop_map(|(frame_number, window_size, payload)| {
                DataFrame::new(frame_number, window_size, payload)
            })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(256))]

        #[test]
        fn roundtrip(frame in arbitrary_frame()) {
            let parsed = DataFrame::parse(&frame.serialize()).unwrap();
            prop_assert_eq!(parsed, frame);
        }

        #[test]
        fn arbitrary_bytes_never_panic(raw in proptest::collection::vec(any::<u8>(), 0..300)) {
            let _ = DataFrame::parse(&raw);
        }
    }
}
