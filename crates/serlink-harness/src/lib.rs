//! Session engine for the serlink qualification harness.
//!
//! Drives the three-phase session over any [`serlink_link::Link`]: the
//! bootstrap exchange, two mirrored Selective-Repeat data phases, and the
//! synchronized results exchange.

pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod session;
pub mod stats;

pub use config::HarnessConfig;
pub use error::SessionError;
pub use session::{Role, SessionOutcome, run_master, run_slave};
