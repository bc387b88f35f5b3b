//! Codec error types.

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FrameError {
    #[error("record too short: need at least {min} bytes, got {actual}")]
    TooShort { min: usize, actual: usize },

    #[error("record length mismatch: expected {expected} bytes, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("invalid start-of-frame byte: 0x{0:02x}")]
    InvalidSof(u8),

    #[error("invalid end-of-frame byte: 0x{0:02x}")]
    InvalidEof(u8),

    #[error("control frame magic mismatch")]
    InvalidMagic,
}
