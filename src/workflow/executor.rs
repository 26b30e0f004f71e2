//! Task executor trait and the simulated implementation

use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use rand::{Rng, SeedableRng, rngs::StdRng};

use super::types::{ExecutionOutcome, Workflow};
use crate::config::SimulationConfig;

/// Performs the actual work behind a workflow run.
///
/// The runner owns the state machine and the counters; an executor only
/// reports how a single run went. Swap in a real converter or mailer here.
#[async_trait]
pub trait TaskExecutor: Send + Sync {
    async fn execute(&self, workflow: &Workflow) -> ExecutionOutcome;
}

/// Stand-in executor: waits a random delay, then succeeds or fails at random.
pub struct SimulatedExecutor {
    config: SimulationConfig,
    rng: Mutex<StdRng>,
}

impl SimulatedExecutor {
    pub fn new(config: SimulationConfig) -> Self {
        Self {
            config,
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    /// Deterministic draws, for tests and reproducible demos
    pub fn with_seed(config: SimulationConfig, seed: u64) -> Self {
        Self {
            config,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    fn draw_delay(&self) -> Duration {
        let ms = self
            .rng
            .lock()
            .random_range(self.config.min_delay_ms..self.config.max_delay_ms);
        Duration::from_millis(ms)
    }

    fn draw_outcome(&self) -> ExecutionOutcome {
        let mut rng = self.rng.lock();
        let roll: f64 = rng.random();
        if roll > self.config.failure_rate {
            ExecutionOutcome::Success {
                files_processed: rng.random_range(self.config.min_files..self.config.max_files),
            }
        } else {
            ExecutionOutcome::Failure {
                reason: self.config.failure_reason.clone(),
            }
        }
    }
}

impl Default for SimulatedExecutor {
    fn default() -> Self {
        Self::new(SimulationConfig::default())
    }
}

#[async_trait]
impl TaskExecutor for SimulatedExecutor {
    async fn execute(&self, workflow: &Workflow) -> ExecutionOutcome {
        let delay = self.draw_delay();
        tracing::debug!(
            workflow_id = %workflow.id,
            delay_ms = delay.as_millis() as u64,
            "Simulating workflow run"
        );
        tokio::time::sleep(delay).await;
        self.draw_outcome()
    }
}
