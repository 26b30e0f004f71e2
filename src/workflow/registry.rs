//! Workflow registry: persisted definitions plus an in-memory mirror

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use super::{
    WorkflowError, WorkflowResult,
    types::{Workflow, WorkflowDraft, WorkflowId, WorkflowStatus},
};
use crate::{
    activity::{LogDetails, LogLevel, LogRecorder},
    stats::DashboardStats,
    store::{Listing, SharedKvStore, StoreResult, WORKFLOW_PREFIX, load_prefixed, workflow_key},
    utils::IdGenerator,
};

/// CRUD over workflow definitions.
///
/// Each workflow is stored under `workflow:<id>`. The mirror is ordered by
/// `created`, newest first, and is what every read serves from.
///
/// Writes to an existing id are serialized by a per-id lock held across the
/// store write, so a read-modify-write never overwrites a concurrent one.
pub struct WorkflowRegistry {
    store: SharedKvStore,
    activity: Arc<LogRecorder>,
    ids: IdGenerator,
    workflows: RwLock<Vec<Workflow>>,
    write_locks: DashMap<WorkflowId, Arc<Mutex<()>>>,
}

impl WorkflowRegistry {
    pub fn new(store: SharedKvStore, activity: Arc<LogRecorder>) -> Self {
        Self {
            store,
            activity,
            ids: IdGenerator::new(),
            workflows: RwLock::new(Vec::new()),
            write_locks: DashMap::new(),
        }
    }

    fn write_lock(&self, id: &WorkflowId) -> Arc<Mutex<()>> {
        self.write_locks.entry(id.clone()).or_default().clone()
    }

    /// Reload every persisted workflow into the mirror.
    ///
    /// Undecodable records are dropped and counted in `Listing::skipped`.
    /// When the store cannot be listed the mirror is emptied and the error
    /// returned, so callers can tell "nothing yet" from "could not read".
    pub async fn list(&self) -> StoreResult<Listing<Workflow>> {
        let mut listing =
            match load_prefixed::<Workflow>(self.store.as_ref(), WORKFLOW_PREFIX).await {
                Ok(listing) => listing,
                Err(e) => {
                    self.workflows.write().clear();
                    return Err(e);
                }
            };

        listing.records.sort_by(|a, b| b.created.cmp(&a.created));
        if let Some(newest) = listing.records.first() {
            self.ids.observe(newest.created);
        }
        *self.workflows.write() = listing.records.clone();

        debug!(
            loaded = listing.records.len(),
            skipped = listing.skipped,
            "Loaded workflows"
        );
        Ok(listing)
    }

    pub async fn create(&self, draft: WorkflowDraft) -> WorkflowResult<Workflow> {
        if draft.name.trim().is_empty() {
            return Err(WorkflowError::Validation(
                "Please enter a workflow name".to_string(),
            ));
        }

        let workflow = Workflow::from_draft(draft, self.ids.next());
        if let Err(e) = self.persist(&workflow).await {
            error!(name = %workflow.name, error = %e, "Failed to create workflow");
            return Err(e);
        }
        self.workflows.write().insert(0, workflow.clone());

        info!(workflow_id = %workflow.id, kind = %workflow.kind, "Created workflow");
        self.activity
            .record(
                LogLevel::Info,
                format!("Created workflow: {}", workflow.name),
                LogDetails::new(),
            )
            .await;
        Ok(workflow)
    }

    /// Persist `workflow` verbatim and replace the mirror entry with its id.
    pub async fn update(&self, workflow: &Workflow) -> WorkflowResult<()> {
        let lock = self.write_lock(&workflow.id);
        let _held = lock.lock().await;
        self.write_through(workflow).await
    }

    /// Atomic read-modify-write of one workflow.
    ///
    /// `change` receives the current record. Returning `None` leaves the
    /// workflow untouched and yields `Ok(None)`; otherwise the new record is
    /// persisted, mirrored and returned.
    pub async fn modify<F>(&self, id: &WorkflowId, change: F) -> WorkflowResult<Option<Workflow>>
    where
        F: FnOnce(&Workflow) -> Option<Workflow>,
    {
        let lock = self.write_lock(id);
        let _held = lock.lock().await;

        let current = self
            .get(id)
            .ok_or_else(|| WorkflowError::NotFound(id.clone()))?;
        let Some(next) = change(&current) else {
            return Ok(None);
        };
        self.write_through(&next).await?;
        Ok(Some(next))
    }

    /// Remove a workflow. Returns `false` (and does nothing) for unknown ids.
    pub async fn delete(&self, id: &WorkflowId) -> WorkflowResult<bool> {
        let lock = self.write_lock(id);
        let _held = lock.lock().await;

        if self.get(id).is_none() {
            debug!(workflow_id = %id, "Delete of unknown workflow ignored");
            return Ok(false);
        }

        if let Err(e) = self.store.delete(&workflow_key(id.as_str())).await {
            error!(workflow_id = %id, error = %e, "Failed to delete workflow");
            return Err(e.into());
        }
        self.workflows.write().retain(|w| &w.id != id);
        self.write_locks.remove(id);

        info!(workflow_id = %id, "Deleted workflow");
        self.activity
            .record(LogLevel::Info, "Deleted workflow", LogDetails::new())
            .await;
        Ok(true)
    }

    /// Flip `enabled` on the current record and return the new record.
    pub async fn toggle_enabled(&self, id: &WorkflowId) -> WorkflowResult<Workflow> {
        let updated = self
            .modify(id, |current| Some(current.toggled()))
            .await?
            .ok_or_else(|| WorkflowError::NotFound(id.clone()))?;

        let verb = if updated.enabled { "Enabled" } else { "Disabled" };
        self.activity
            .record(
                LogLevel::Info,
                format!("{verb} workflow: {}", updated.name),
                LogDetails::new(),
            )
            .await;
        Ok(updated)
    }

    /// Put workflows left `running` by an interrupted session back to `ready`.
    ///
    /// Only meaningful before any run has been started on this registry.
    /// Returns the number of records reset.
    pub async fn reset_interrupted(&self) -> WorkflowResult<usize> {
        let stale: Vec<WorkflowId> = self
            .workflows
            .read()
            .iter()
            .filter(|w| w.status == WorkflowStatus::Running)
            .map(|w| w.id.clone())
            .collect();

        let mut reset = 0;
        for id in stale {
            let changed = self
                .modify(&id, |current| {
                    (current.status == WorkflowStatus::Running).then(|| current.interrupted())
                })
                .await?;
            if changed.is_some() {
                warn!(workflow_id = %id, "Reset workflow left running by an interrupted session");
                reset += 1;
            }
        }
        Ok(reset)
    }

    pub fn get(&self, id: &WorkflowId) -> Option<Workflow> {
        self.workflows.read().iter().find(|w| &w.id == id).cloned()
    }

    /// Mirror contents, newest first
    pub fn snapshot(&self) -> Vec<Workflow> {
        self.workflows.read().clone()
    }

    pub fn len(&self) -> usize {
        self.workflows.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.workflows.read().is_empty()
    }

    pub fn stats(&self) -> DashboardStats {
        DashboardStats::from_workflows(&self.workflows.read())
    }

    /// Persist, then replace the mirror entry. Caller holds the id's lock.
    async fn write_through(&self, workflow: &Workflow) -> WorkflowResult<()> {
        if let Err(e) = self.persist(workflow).await {
            error!(workflow_id = %workflow.id, error = %e, "Failed to update workflow");
            return Err(e);
        }

        let mut workflows = self.workflows.write();
        if let Some(slot) = workflows.iter_mut().find(|w| w.id == workflow.id) {
            *slot = workflow.clone();
        }
        Ok(())
    }

    async fn persist(&self, workflow: &Workflow) -> WorkflowResult<()> {
        let encoded = serde_json::to_string(workflow)?;
        self.store
            .set(&workflow_key(workflow.id.as_str()), encoded)
            .await?;
        Ok(())
    }
}

impl std::fmt::Debug for WorkflowRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowRegistry")
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}
