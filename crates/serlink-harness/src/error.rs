//! Session error surface.
//!
//! Only configuration, transport, barrier, and exhaustion failures abort a
//! session. Per-frame format, checksum, and content failures are counters,
//! never errors.

use std::time::Duration;

use serlink_link::LinkError;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("protocol version mismatch: peer {peer}, local {local}")]
    VersionMismatch { peer: u32, local: u32 },

    #[error("{stage} failed: {reason}")]
    Handshake {
        stage: &'static str,
        reason: String,
    },

    #[error("transport failure: {0}")]
    Transport(#[from] LinkError),

    #[error("phase stalled: no progress within {0:?}")]
    Stalled(Duration),

    #[error("session cancelled")]
    Cancelled,
}
