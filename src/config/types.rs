use std::{path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};

use super::{ConfigError, ConfigResult};
use crate::activity::DEFAULT_LOG_CAPACITY;

/// Top-level application configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JetStreamConfig {
    /// JSON file backing the key-value store; `None` keeps everything in memory
    pub store_path: Option<PathBuf>,
    /// Maximum number of log entries mirrored in memory
    pub log_capacity: usize,
    #[serde(default)]
    pub simulation: SimulationConfig,
    /// How long shutdown waits for in-flight runs
    pub shutdown_timeout_secs: u64,
}

impl Default for JetStreamConfig {
    fn default() -> Self {
        Self {
            store_path: None,
            log_capacity: DEFAULT_LOG_CAPACITY,
            simulation: SimulationConfig::default(),
            shutdown_timeout_secs: 30,
        }
    }
}

impl JetStreamConfig {
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.log_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                field: "log_capacity".to_string(),
                value: self.log_capacity.to_string(),
                reason: "must be greater than 0".to_string(),
            });
        }
        self.simulation.validate()
    }
}

/// Parameters of the simulated executor
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimulationConfig {
    /// Inclusive lower bound of the run delay
    pub min_delay_ms: u64,
    /// Exclusive upper bound of the run delay
    pub max_delay_ms: u64,
    /// Probability that a run fails
    pub failure_rate: f64,
    pub min_files: u64,
    pub max_files: u64,
    pub failure_reason: String,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            min_delay_ms: 2000,
            max_delay_ms: 5000,
            failure_rate: 0.2,
            min_files: 5,
            max_files: 25,
            failure_reason: "Connection timeout".to_string(),
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        if self.min_delay_ms >= self.max_delay_ms {
            return Err(ConfigError::ValidationFailed {
                reason: format!(
                    "min_delay_ms ({}) must be less than max_delay_ms ({})",
                    self.min_delay_ms, self.max_delay_ms
                ),
            });
        }
        if !(0.0..=1.0).contains(&self.failure_rate) {
            return Err(ConfigError::InvalidValue {
                field: "failure_rate".to_string(),
                value: self.failure_rate.to_string(),
                reason: "must be within [0, 1]".to_string(),
            });
        }
        if self.min_files >= self.max_files {
            return Err(ConfigError::ValidationFailed {
                reason: format!(
                    "min_files ({}) must be less than max_files ({})",
                    self.min_files, self.max_files
                ),
            });
        }
        Ok(())
    }
}
