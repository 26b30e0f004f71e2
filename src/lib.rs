//! JetStream: define, trigger and monitor office automation workflows.
//!
//! Workflows and activity log entries are persisted in a key-value store
//! ([`store::KvStore`]). Runs go through [`workflow::WorkflowRunner`], which
//! delegates the actual work to a [`workflow::TaskExecutor`]; the default
//! [`workflow::SimulatedExecutor`] only waits and rolls a random outcome.

pub mod activity;
pub mod app_context;
pub mod config;
pub mod dashboard;
pub mod observability;
pub mod stats;
pub mod store;
pub mod utils;
pub mod workflow;

pub use activity::DEFAULT_LOG_CAPACITY;
pub use app_context::{AppContext, AppContextBuilder, AppError};
