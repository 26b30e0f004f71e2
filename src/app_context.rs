use std::sync::Arc;

use tracing::{info, warn};

use crate::{
    activity::LogRecorder,
    config::{ConfigError, JetStreamConfig},
    stats::DashboardStats,
    store::{FileStore, MemoryStore, SharedKvStore, StoreError},
    workflow::{SimulatedExecutor, TaskExecutor, WorkflowRegistry, WorkflowRunner},
};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to open store: {0}")]
    Store(#[from] StoreError),
}

/// Application state for one session.
///
/// Owns the store handle and the in-memory mirrors built from it. Created by
/// [`AppContextBuilder`], which loads workflows and logs from the store;
/// [`shutdown`](Self::shutdown) drains in-flight runs so their outcomes are
/// persisted before the process exits.
#[derive(Clone)]
pub struct AppContext {
    pub config: JetStreamConfig,
    pub store: SharedKvStore,
    pub activity: Arc<LogRecorder>,
    pub registry: Arc<WorkflowRegistry>,
    pub runner: WorkflowRunner,
}

impl AppContext {
    pub fn builder(config: JetStreamConfig) -> AppContextBuilder {
        AppContextBuilder::new(config)
    }

    pub fn stats(&self) -> DashboardStats {
        self.registry.stats()
    }

    /// Wait for running workflows to resolve, up to the configured timeout.
    ///
    /// Returns `false` if some runs were still going when the timeout hit;
    /// their outcomes are lost.
    pub async fn shutdown(&self) -> bool {
        let active = self.runner.active_runs();
        if active > 0 {
            info!(active_runs = active, "Waiting for running workflows");
        }
        self.runner.wait_idle(self.config.shutdown_timeout()).await
    }
}

impl std::fmt::Debug for AppContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppContext")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .field("activity", &self.activity)
            .finish_non_exhaustive()
    }
}

pub struct AppContextBuilder {
    config: JetStreamConfig,
    store: Option<SharedKvStore>,
    executor: Option<Arc<dyn TaskExecutor>>,
}

impl AppContextBuilder {
    pub fn new(config: JetStreamConfig) -> Self {
        Self {
            config,
            store: None,
            executor: None,
        }
    }

    /// Use this store instead of the one named by the config
    pub fn store(mut self, store: SharedKvStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Use this executor instead of the simulated one
    pub fn executor(mut self, executor: Arc<dyn TaskExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Validate the config, open the store and load both mirrors.
    ///
    /// An unreadable store is not fatal here: the session starts with empty
    /// mirrors, as on a first run. Workflows persisted as `running` are put
    /// back to `ready`.
    pub async fn build(self) -> Result<AppContext, AppError> {
        self.config.validate()?;

        let store: SharedKvStore = match self.store {
            Some(store) => store,
            None => match &self.config.store_path {
                Some(path) => Arc::new(FileStore::open(path).await?),
                None => Arc::new(MemoryStore::new()),
            },
        };
        let executor: Arc<dyn TaskExecutor> = match self.executor {
            Some(executor) => executor,
            None => Arc::new(SimulatedExecutor::new(self.config.simulation.clone())),
        };

        let activity = Arc::new(LogRecorder::new(store.clone(), self.config.log_capacity));
        let registry = Arc::new(WorkflowRegistry::new(store.clone(), activity.clone()));
        let runner = WorkflowRunner::new(registry.clone(), activity.clone(), executor);

        match registry.list().await {
            Ok(listing) if listing.skipped > 0 => warn!(
                loaded = listing.records.len(),
                skipped = listing.skipped,
                "Some workflow records could not be decoded"
            ),
            Ok(_) => {}
            Err(e) => info!(error = %e, "Starting fresh"),
        }
        // No run can be in flight yet, so any `running` record is stale
        match registry.reset_interrupted().await {
            Ok(0) => {}
            Ok(reset) => warn!(reset, "Reset workflows left running by an earlier session"),
            Err(e) => warn!(error = %e, "Could not reset interrupted workflows"),
        }
        match activity.load().await {
            Ok(listing) if listing.skipped > 0 => warn!(
                loaded = listing.records.len(),
                skipped = listing.skipped,
                "Some log records could not be decoded"
            ),
            Ok(_) => {}
            Err(e) => info!(error = %e, "No logs yet"),
        }

        Ok(AppContext {
            config: self.config,
            store,
            activity,
            registry,
            runner,
        })
    }
}
