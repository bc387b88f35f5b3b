//! Protocol constants shared by every frame codec.

/// Protocol version carried in the settings image. Peers with a different
/// version abort the session during the bootstrap exchange.
pub const PROTOCOL_VERSION: u32 = 4;

/// Start-of-frame byte for data frames.
pub const SOF_DATA: u8 = 0x02;
/// Start-of-frame byte for control frames (ack, ready).
pub const SOF_CONTROL: u8 = 0x04;
/// End-of-frame byte, shared by every framed record.
pub const EOF: u8 = 0x03;

/// Data frame header: SOF(1) + frame_number(4) + window_size(2) + checksum(2).
pub const DATA_HEADER_LEN: usize = 9;
/// Data frame trailer: EOF(1).
pub const DATA_TRAILER_LEN: usize = 1;
/// Total framing overhead around a data payload.
pub const DATA_OVERHEAD: usize = DATA_HEADER_LEN + DATA_TRAILER_LEN;

/// Ack frame: SOF(1) + "ACK"(3) + base(4) + bitmap(4) + EOF(1).
pub const ACK_FRAME_LEN: usize = 13;
/// Ready frame: SOF(1) + "READY"(5) + EOF(1).
pub const READY_FRAME_LEN: usize = 7;

/// Bootstrap acknowledgment sent by the responder after validating settings.
/// A bare ASCII literal, not a framed record.
pub const BOOTSTRAP_ACK: &[u8; 3] = b"ACK";

/// Number of consecutive frame slots one ack bitmap can cover.
pub const ACK_BITMAP_WIDTH: u32 = 32;
