//! TOML-based tuning configuration.
//!
//! All values have protocol-default fallbacks, so the config file is
//! optional and may contain any subset of sections. None of these knobs
//! change wire behavior; they tune window sizing, burst batching, and the
//! session's timing budgets.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use serlink_protocol::WindowParams;

use crate::error::SessionError;

/// Top-level harness configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HarnessConfig {
    #[serde(default)]
    pub window: WindowSection,
    #[serde(default)]
    pub session: SessionSection,
    #[serde(default)]
    pub burst: BurstSection,
}

impl HarnessConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, SessionError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| SessionError::Config(format!("failed to read config file: {e}")))?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self, SessionError> {
        toml::from_str(s).map_err(|e| SessionError::Config(format!("failed to parse config: {e}")))
    }
}

/// The `[window]` section: sliding-window sizing bounds.
#[derive(Debug, Clone, Deserialize)]
pub struct WindowSection {
    #[serde(default = "default_window_initial")]
    pub initial: u16,
    #[serde(default = "default_window_min")]
    pub min: u16,
    #[serde(default = "default_window_max")]
    pub max: u16,
}

impl WindowSection {
    pub fn params(&self) -> Result<WindowParams, SessionError> {
        if self.min == 0 || self.min > self.initial || self.initial > self.max {
            return Err(SessionError::Config(format!(
                "window bounds must satisfy 0 < min <= initial <= max, got {}/{}/{}",
                self.min, self.initial, self.max
            )));
        }
        Ok(WindowParams {
            initial: self.initial,
            min: self.min,
            max: self.max,
        })
    }
}

fn default_window_initial() -> u16 {
    serlink_protocol::constants::WINDOW_INIT
}

fn default_window_min() -> u16 {
    serlink_protocol::constants::WINDOW_MIN
}

fn default_window_max() -> u16 {
    serlink_protocol::constants::WINDOW_MAX
}

impl Default for WindowSection {
    fn default() -> Self {
        Self {
            initial: default_window_initial(),
            min: default_window_min(),
            max: default_window_max(),
        }
    }
}

/// The `[session]` section: timing budgets.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionSection {
    /// Budget for the ready-sync barrier before the results exchange.
    #[serde(default = "default_ready_timeout_secs")]
    pub ready_timeout_secs: u64,
    /// How long the responder waits for the initiator's settings image.
    #[serde(default = "default_settings_timeout_secs")]
    pub settings_timeout_secs: u64,
    /// How long the initiator waits for the bootstrap acknowledgment.
    #[serde(default = "default_bootstrap_timeout_secs")]
    pub bootstrap_timeout_secs: u64,
    /// A data phase fails after this long without forward progress.
    #[serde(default = "default_stall_timeout_secs")]
    pub stall_timeout_secs: u64,
    /// Line stabilization pause after opening the port.
    #[serde(default = "default_stabilization_ms")]
    pub stabilization_ms: u64,
    /// Drain pause between the data phases and the ready sync.
    #[serde(default = "default_ready_pause_ms")]
    pub ready_pause_ms: u64,
}

impl SessionSection {
    pub fn ready_timeout(&self) -> Duration {
        Duration::from_secs(self.ready_timeout_secs)
    }

    pub fn settings_timeout(&self) -> Duration {
        Duration::from_secs(self.settings_timeout_secs)
    }

    pub fn bootstrap_timeout(&self) -> Duration {
        Duration::from_secs(self.bootstrap_timeout_secs)
    }

    pub fn stall_timeout(&self) -> Duration {
        Duration::from_secs(self.stall_timeout_secs)
    }

    pub fn stabilization(&self) -> Duration {
        Duration::from_millis(self.stabilization_ms)
    }

    pub fn ready_pause(&self) -> Duration {
        Duration::from_millis(self.ready_pause_ms)
    }
}

fn default_ready_timeout_secs() -> u64 {
    30
}

fn default_settings_timeout_secs() -> u64 {
    60
}

fn default_bootstrap_timeout_secs() -> u64 {
    10
}

fn default_stall_timeout_secs() -> u64 {
    60
}

fn default_stabilization_ms() -> u64 {
    1000
}

fn default_ready_pause_ms() -> u64 {
    1000
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            ready_timeout_secs: default_ready_timeout_secs(),
            settings_timeout_secs: default_settings_timeout_secs(),
            bootstrap_timeout_secs: default_bootstrap_timeout_secs(),
            stall_timeout_secs: default_stall_timeout_secs(),
            stabilization_ms: default_stabilization_ms(),
            ready_pause_ms: default_ready_pause_ms(),
        }
    }
}

/// The `[burst]` section: batching cap on top of the payload-size ladder.
#[derive(Debug, Clone, Deserialize)]
pub struct BurstSection {
    #[serde(default = "default_burst_max_frames")]
    pub max_frames: usize,
}

fn default_burst_max_frames() -> usize {
    16
}

impl Default for BurstSection {
    fn default() -> Self {
        Self {
            max_frames: default_burst_max_frames(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config = HarnessConfig::parse("").unwrap();
        assert_eq!(config.window.initial, 16);
        assert_eq!(config.window.min, 4);
        assert_eq!(config.window.max, 32);
        assert_eq!(config.session.ready_timeout_secs, 30);
        assert_eq!(config.burst.max_frames, 16);
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let config = HarnessConfig::parse("[window]\nmax = 8\ninitial = 8\n").unwrap();
        assert_eq!(config.window.max, 8);
        assert_eq!(config.window.min, 4);
        assert_eq!(config.session.stall_timeout_secs, 60);
    }

    #[test]
    fn invalid_window_bounds_rejected() {
        let config = HarnessConfig::parse("[window]\nmin = 20\n").unwrap();
        assert!(matches!(
            config.window.params(),
            Err(SessionError::Config(_))
        ));
    }

    #[test]
    fn malformed_toml_rejected() {
        assert!(matches!(
            HarnessConfig::parse("[window"),
            Err(SessionError::Config(_))
        ));
    }
}
