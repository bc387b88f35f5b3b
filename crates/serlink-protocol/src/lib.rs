//! Selective-Repeat ARQ state machines for the serlink protocol.
//!
//! This crate implements the stateful protocol logic: the send-side sliding
//! window with adaptive sizing, the receive-side reassembler, and the burst
//! planner. Everything here is deliberately decoupled from I/O — state
//! machines take inputs and produce decisions that the engine acts on.

pub mod burst;
pub mod constants;
pub mod reassembly;
pub mod window;

pub use burst::burst_cap;
pub use reassembly::{Offer, Reassembler};
pub use window::{SendWindow, WindowParams};
