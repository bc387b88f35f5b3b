//! The byte-duplex contract the engine consumes.

use std::time::Duration;

use crate::error::LinkError;
use crate::timeout::transfer_timeout;

/// A blocking, full-duplex, byte-oriented pipe.
///
/// One read and one write may be in flight concurrently; a second read (or
/// second write) serializes behind the first. The engine upholds this by
/// giving the sender task exclusive write access and the receiver task
/// exclusive read access.
///
/// Partial-read semantics are explicit: [`Link::read_some_with_timeout`]
/// returns as soon as at least one byte is available, while
/// [`Link::read_exact_with_timeout`] loops until the buffer is full or the
/// budget elapses. Callers must never rely on a timeout-bounded partial
/// fill by accident.
pub trait Link: Send + Sync {
    /// Write every byte of `buf`, returning only once the whole buffer has
    /// been handed to the transport. Short writes are not observable.
    fn write(&self, buf: &[u8]) -> Result<(), LinkError>;

    /// Fill `buf` completely, waiting up to `timeout`. On timeout the error
    /// reports how many bytes had arrived; those bytes are consumed.
    fn read_exact_with_timeout(&self, buf: &mut [u8], timeout: Duration) -> Result<(), LinkError>;

    /// Read at least one byte into `buf`, waiting up to `timeout`. Returns
    /// the number of bytes read.
    fn read_some_with_timeout(
        &self,
        buf: &mut [u8],
        timeout: Duration,
    ) -> Result<usize, LinkError>;

    /// Force buffered outbound bytes onto the wire.
    fn flush(&self) -> Result<(), LinkError>;

    /// Configured line rate in bits per second.
    fn baud_rate(&self) -> u32;

    /// Default read/write budget for a transfer of `bytes`, derived from the
    /// line rate. Callers may override per call.
    fn default_timeout(&self, bytes: usize) -> Duration {
        transfer_timeout(bytes, self.baud_rate())
    }
}
