use crate::can::rx::DEFAULT_QUEUE_DEPTH;
use crate::cli::DEFAULT_DASHBOARD_EVERY;
use crate::error::EcuError;
use crate::logging::LogLevel;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_STEP_PERIOD_MS: u64 = 100;
const DEFAULT_STEP_DT_S: f32 = 0.1;
const DEFAULT_CLI_POLL_PERIOD_MS: u64 = 10;

/// Runtime configuration. Every field has a default, so a JSON document
/// only needs the fields it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EcuConfig {
    pub step_period_ms: u64,
    pub step_dt_s: f32,
    pub cli_poll_period_ms: u64,
    pub dashboard_every_polls: u32,
    pub can_rx_queue_depth: usize,
    pub can_rx_logging: bool,
    pub log_level: LogLevel,
}

impl Default for EcuConfig {
    fn default() -> Self {
        Self {
            step_period_ms: DEFAULT_STEP_PERIOD_MS,
            step_dt_s: DEFAULT_STEP_DT_S,
            cli_poll_period_ms: DEFAULT_CLI_POLL_PERIOD_MS,
            dashboard_every_polls: DEFAULT_DASHBOARD_EVERY,
            can_rx_queue_depth: DEFAULT_QUEUE_DEPTH,
            can_rx_logging: true,
            log_level: LogLevel::Info,
        }
    }
}

impl EcuConfig {
    /// Parse and validate a JSON document.
    pub fn from_json(text: &str) -> Result<Self, EcuError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, EcuError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), EcuError> {
        if self.step_period_ms == 0 {
            return Err(EcuError::InvalidConfig("step_period_ms must be non-zero"));
        }
        if !self.step_dt_s.is_finite() || self.step_dt_s <= 0.0 {
            return Err(EcuError::InvalidConfig("step_dt_s must be a positive number"));
        }
        if self.cli_poll_period_ms == 0 {
            return Err(EcuError::InvalidConfig("cli_poll_period_ms must be non-zero"));
        }
        if self.dashboard_every_polls == 0 {
            return Err(EcuError::InvalidConfig("dashboard_every_polls must be non-zero"));
        }
        if self.can_rx_queue_depth == 0 {
            return Err(EcuError::InvalidConfig("can_rx_queue_depth must be non-zero"));
        }
        Ok(())
    }

    pub fn step_period(&self) -> Duration {
        Duration::from_millis(self.step_period_ms)
    }

    pub fn cli_poll_period(&self) -> Duration {
        Duration::from_millis(self.cli_poll_period_ms)
    }
}
