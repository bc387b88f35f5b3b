//! Tracing subscriber configuration.
//!
//! Log levels follow these conventions:
//! - ERROR: fatal session failures
//! - WARN: recoverable oddities (partial reads, content mismatches)
//! - INFO: phase transitions, progress milestones, final reports
//! - DEBUG: per-frame events (retransmits, duplicates, parse failures)
//! - TRACE: window state changes, burst accounting

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Initialize console plus append-mode file logging.
///
/// The file is named by role and port (`serlink_<role>_<port>_<epoch>.log`)
/// so concurrent peers on one host never share a sink. Level is controlled
/// via `RUST_LOG`, defaulting to `info`.
pub fn init(role: &str, port: &str) -> std::io::Result<PathBuf> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let sanitized: String = port
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect();
    let stamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let path = PathBuf::from(format!("serlink_{role}_{sanitized}_{stamp}.log"));

    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)?;

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Arc::new(file)),
        )
        .init();

    Ok(path)
}

/// Initialize the subscriber for tests.
///
/// Uses `try_init` to avoid panicking if called multiple times.
pub fn init_for_tests() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}
