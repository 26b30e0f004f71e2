//! Workflow definitions, their registry and the run state machine

mod executor;
mod registry;
mod runner;
pub mod types;

pub use executor::{SimulatedExecutor, TaskExecutor};
pub use registry::WorkflowRegistry;
pub use runner::{RunHandle, WorkflowRunner};
pub use types::*;

use crate::store::StoreError;

/// Error kinds for workflow operations
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("Invalid workflow: {0}")]
    Validation(String),

    #[error("Workflow not found: {0}")]
    NotFound(WorkflowId),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<serde_json::Error> for WorkflowError {
    fn from(e: serde_json::Error) -> Self {
        WorkflowError::Store(StoreError::Codec(e))
    }
}

pub type WorkflowResult<T> = Result<T, WorkflowError>;
