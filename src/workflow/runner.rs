//! Run admission and resolution for workflows.
//!
//! `ready|success|failed --run--> running --(executor)--> success|failed`

use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use dashmap::DashSet;
use serde_json::json;
use tokio::{task::JoinHandle, time::Instant};
use tracing::{debug, error, info, warn};

use super::{
    WorkflowError, WorkflowResult,
    executor::TaskExecutor,
    registry::WorkflowRegistry,
    types::{ExecutionOutcome, Workflow, WorkflowId},
};
use crate::{
    activity::{LogDetails, LogLevel, LogRecorder},
    utils::now_millis,
};

/// Pending resolution of a started run
#[derive(Debug)]
pub struct RunHandle {
    workflow_id: WorkflowId,
    handle: JoinHandle<Option<Workflow>>,
}

impl RunHandle {
    pub fn workflow_id(&self) -> &WorkflowId {
        &self.workflow_id
    }

    /// Wait for the run to resolve and return the final record.
    ///
    /// `None` when the workflow was deleted while running.
    pub async fn wait(self) -> Option<Workflow> {
        match self.handle.await {
            Ok(result) => result,
            Err(e) => {
                error!(workflow_id = %self.workflow_id, error = %e, "Run task failed");
                None
            }
        }
    }
}

/// Starts runs and folds their outcomes back into the registry.
///
/// Each run resolves on its own spawned task; any number of workflows may be
/// running at once but a given id runs at most once at a time.
#[derive(Clone)]
pub struct WorkflowRunner {
    registry: Arc<WorkflowRegistry>,
    activity: Arc<LogRecorder>,
    executor: Arc<dyn TaskExecutor>,
    in_flight: Arc<DashSet<WorkflowId>>,
    active_runs: Arc<AtomicUsize>,
}

/// Releases the run slot for an id even if the task panics
struct InFlightGuard {
    workflow_id: WorkflowId,
    in_flight: Arc<DashSet<WorkflowId>>,
    active_runs: Arc<AtomicUsize>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.in_flight.remove(&self.workflow_id);
        self.active_runs.fetch_sub(1, Ordering::Release);
    }
}

impl WorkflowRunner {
    pub fn new(
        registry: Arc<WorkflowRegistry>,
        activity: Arc<LogRecorder>,
        executor: Arc<dyn TaskExecutor>,
    ) -> Self {
        Self {
            registry,
            activity,
            executor,
            in_flight: Arc::new(DashSet::new()),
            active_runs: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn claim(&self, workflow_id: &WorkflowId) -> Option<InFlightGuard> {
        if !self.in_flight.insert(workflow_id.clone()) {
            return None;
        }
        self.active_runs.fetch_add(1, Ordering::AcqRel);
        Some(InFlightGuard {
            workflow_id: workflow_id.clone(),
            in_flight: Arc::clone(&self.in_flight),
            active_runs: Arc::clone(&self.active_runs),
        })
    }

    /// Start a run.
    ///
    /// Returns `Ok(None)` without touching anything when the workflow is
    /// disabled or already running.
    pub async fn run(&self, id: &WorkflowId) -> WorkflowResult<Option<RunHandle>> {
        if self.registry.get(id).is_none() {
            return Err(WorkflowError::NotFound(id.clone()));
        }
        let Some(guard) = self.claim(id) else {
            debug!(workflow_id = %id, "Run ignored, already in flight");
            return Ok(None);
        };

        let started_at = Instant::now();
        let started = self
            .registry
            .modify(id, |current| {
                if current.can_run() {
                    Some(current.started(now_millis()))
                } else {
                    debug!(
                        workflow_id = %id,
                        enabled = current.enabled,
                        status = %current.status,
                        "Run ignored"
                    );
                    None
                }
            })
            .await?;
        let Some(running) = started else {
            return Ok(None);
        };
        self.activity
            .record(
                LogLevel::Info,
                format!("Starting workflow: {}", running.name),
                LogDetails::new(),
            )
            .await;
        info!(workflow_id = %id, "Workflow started");

        let runner = self.clone();
        let handle = tokio::spawn(async move {
            let _guard = guard;
            let outcome = runner.executor.execute(&running).await;
            runner.resolve(&running, outcome, started_at.elapsed()).await
        });

        Ok(Some(RunHandle {
            workflow_id: id.clone(),
            handle,
        }))
    }

    async fn resolve(
        &self,
        running: &Workflow,
        outcome: ExecutionOutcome,
        elapsed: Duration,
    ) -> Option<Workflow> {
        // Fold into the latest record so changes made mid-run are kept
        let folded = self
            .registry
            .modify(&running.id, |current| Some(current.resolved(&outcome)))
            .await;
        let finished = match folded {
            Ok(Some(finished)) => finished,
            Ok(None) | Err(WorkflowError::NotFound(_)) => {
                warn!(workflow_id = %running.id, "Workflow deleted while running, outcome dropped");
                return None;
            }
            Err(e) => {
                warn!(workflow_id = %running.id, error = %e, "Run outcome not persisted");
                self.registry.get(&running.id)?.resolved(&outcome)
            }
        };

        let duration_ms = elapsed.as_millis() as u64;
        match &outcome {
            ExecutionOutcome::Success { files_processed } => {
                info!(
                    workflow_id = %running.id,
                    duration_ms = duration_ms,
                    files_processed = files_processed,
                    "Workflow completed"
                );
                let details = into_details(json!({
                    "workflowId": running.id,
                    "duration": duration_ms,
                    "filesProcessed": files_processed,
                }));
                self.activity
                    .record(
                        LogLevel::Success,
                        format!("Completed workflow: {} ({}ms)", finished.name, duration_ms),
                        details,
                    )
                    .await;
            }
            ExecutionOutcome::Failure { reason } => {
                warn!(workflow_id = %running.id, reason = %reason, "Workflow failed");
                let details = into_details(json!({
                    "workflowId": running.id,
                    "error": reason,
                }));
                self.activity
                    .record(
                        LogLevel::Error,
                        format!("Failed workflow: {} - Simulated error", finished.name),
                        details,
                    )
                    .await;
            }
        }

        Some(finished)
    }

    /// Number of runs that have started but not resolved
    pub fn active_runs(&self) -> usize {
        self.active_runs.load(Ordering::Acquire)
    }

    pub fn is_running(&self, id: &WorkflowId) -> bool {
        self.in_flight.contains(id)
    }

    /// Wait for all in-flight runs to resolve.
    ///
    /// Returns `false` if the timeout was reached with runs still going.
    pub async fn wait_idle(&self, timeout: Duration) -> bool {
        let start = Instant::now();

        loop {
            let active = self.active_runs();
            if active == 0 {
                return true;
            }

            if start.elapsed() >= timeout {
                warn!(remaining_runs = active, "Timed out waiting for runs to finish");
                return false;
            }

            debug!(active_runs = active, "Waiting for runs to finish");
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }
}

impl std::fmt::Debug for WorkflowRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowRunner")
            .field("active_runs", &self.active_runs())
            .finish_non_exhaustive()
    }
}

fn into_details(value: serde_json::Value) -> LogDetails {
    match value {
        serde_json::Value::Object(map) => map,
        _ => LogDetails::new(),
    }
}
