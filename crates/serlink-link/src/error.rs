//! Link error types.

/// Errors surfaced by a [`crate::Link`].
///
/// `Timeout` is the only recoverable variant: phase loops treat it as a
/// silent miss and re-read. Everything else is fatal to the session.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    #[error("read timed out with {received}/{expected} bytes")]
    Timeout { received: usize, expected: usize },

    #[error("link closed by peer")]
    Closed,

    #[error("failed to open port {port}: {reason}")]
    Open { port: String, reason: String },

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl LinkError {
    /// Whether a phase loop may retry after this error.
    pub fn is_timeout(&self) -> bool {
        matches!(self, LinkError::Timeout { .. })
    }
}
