//! Byte-duplex abstraction for the serlink engine.
//!
//! The protocol engine consumes an opaque [`Link`]: blocking reads and
//! writes with bounded timeouts over an ordered, lossy byte pipe. Two
//! implementations live here — the [`serial::SerialLink`] adapter over the
//! OS serial driver, and the [`memory::MemoryLink`] paired duplex used by
//! every deterministic test.

pub mod error;
pub mod memory;
pub mod serial;
pub mod timeout;
pub mod traits;

pub use error::LinkError;
pub use memory::MemoryLink;
pub use serial::SerialLink;
pub use timeout::transfer_timeout;
pub use traits::Link;
