//! Wire formats for the serlink qualification protocol (V4).
//!
//! This crate is pure data transformation: frame codecs, the payload
//! checksum, the bootstrap settings and results images, and the self-test
//! payload patterns. No I/O happens here.

pub mod checksum;
pub mod constants;
pub mod error;
pub mod frame;
pub mod pattern;
pub mod results;
pub mod settings;

pub use checksum::xor_rotate;
pub use error::FrameError;
pub use frame::{AckFrame, DataFrame, READY_WIRE};
pub use pattern::PayloadPattern;
pub use results::Results;
pub use settings::Settings;
