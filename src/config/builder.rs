use std::path::PathBuf;

use super::{ConfigResult, JetStreamConfig, SimulationConfig};

/// Builder for JetStreamConfig that wraps the config itself
#[derive(Debug, Clone, Default)]
pub struct JetStreamConfigBuilder {
    config: JetStreamConfig,
}

impl JetStreamConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes ownership
    pub fn from_config(config: JetStreamConfig) -> Self {
        Self { config }
    }

    // ==================== Storage ====================

    pub fn store_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.store_path = Some(path.into());
        self
    }

    pub fn maybe_store_path(mut self, path: Option<impl Into<PathBuf>>) -> Self {
        self.config.store_path = path.map(Into::into);
        self
    }

    pub fn in_memory(mut self) -> Self {
        self.config.store_path = None;
        self
    }

    // ==================== Activity log ====================

    pub fn log_capacity(mut self, capacity: usize) -> Self {
        self.config.log_capacity = capacity;
        self
    }

    // ==================== Simulation ====================

    pub fn simulation(mut self, simulation: SimulationConfig) -> Self {
        self.config.simulation = simulation;
        self
    }

    pub fn delay_range_ms(mut self, min: u64, max: u64) -> Self {
        self.config.simulation.min_delay_ms = min;
        self.config.simulation.max_delay_ms = max;
        self
    }

    pub fn failure_rate(mut self, rate: f64) -> Self {
        self.config.simulation.failure_rate = rate;
        self
    }

    // ==================== Lifecycle ====================

    pub fn shutdown_timeout_secs(mut self, secs: u64) -> Self {
        self.config.shutdown_timeout_secs = secs;
        self
    }

    // ==================== Build ====================

    pub fn build(self) -> ConfigResult<JetStreamConfig> {
        self.config.validate()?;
        Ok(self.config)
    }

    pub fn build_unchecked(self) -> JetStreamConfig {
        self.config
    }
}

impl JetStreamConfig {
    pub fn builder() -> JetStreamConfigBuilder {
        JetStreamConfigBuilder::new()
    }

    /// Create a builder from this configuration
    pub fn to_builder(&self) -> JetStreamConfigBuilder {
        JetStreamConfigBuilder::from_config(self.clone())
    }
}
