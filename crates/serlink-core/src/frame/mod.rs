//! Frame codecs: data frames and the two control frames (ack, ready).

mod control;
mod data;

pub use control::{AckFrame, READY_WIRE, is_ready};
pub use data::{DataFrame, encode_data_frame};
