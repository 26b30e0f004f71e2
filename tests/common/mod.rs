//! Shared fixtures for integration tests

#![allow(dead_code)]

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use jetstream::{
    AppContext,
    config::{JetStreamConfig, SimulationConfig},
    store::{KvStore, MemoryStore, StoreError, StoreResult},
    workflow::SimulatedExecutor,
};
use parking_lot::Mutex;

/// Memory store that can be switched into an unreachable state, or made to
/// reject writes under one key prefix only
#[derive(Clone, Default)]
pub struct FlakyStore {
    inner: MemoryStore,
    down: Arc<AtomicBool>,
    failing_prefix: Arc<Mutex<Option<String>>>,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    /// Reject `set` and `delete` for keys under `prefix`; `None` heals
    pub fn fail_writes_under(&self, prefix: Option<&str>) {
        *self.failing_prefix.lock() = prefix.map(str::to_string);
    }

    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }

    fn check(&self) -> StoreResult<()> {
        if self.down.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("store is down".to_string()))
        } else {
            Ok(())
        }
    }

    fn check_write(&self, key: &str) -> StoreResult<()> {
        self.check()?;
        match self.failing_prefix.lock().as_deref() {
            Some(prefix) if key.starts_with(prefix) => Err(StoreError::Unavailable(format!(
                "writes under {prefix} rejected"
            ))),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl KvStore for FlakyStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        self.check()?;
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: String) -> StoreResult<()> {
        self.check_write(key)?;
        self.inner.set(key, value).await
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        self.check_write(key)?;
        self.inner.delete(key).await
    }

    async fn list(&self, prefix: &str) -> StoreResult<Vec<String>> {
        self.check()?;
        self.inner.list(prefix).await
    }
}

/// Memory store whose writes yield for a while, longer for running records
#[derive(Clone, Default)]
pub struct SlowStore {
    inner: MemoryStore,
}

impl SlowStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }
}

#[async_trait]
impl KvStore for SlowStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: String) -> StoreResult<()> {
        let delay = if value.contains(r#""status":"running""#) {
            Duration::from_millis(20)
        } else {
            Duration::from_millis(5)
        };
        tokio::time::sleep(delay).await;
        self.inner.set(key, value).await
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        tokio::time::sleep(Duration::from_millis(5)).await;
        self.inner.delete(key).await
    }

    async fn list(&self, prefix: &str) -> StoreResult<Vec<String>> {
        self.inner.list(prefix).await
    }
}

/// App context over `store` with a seeded simulated executor
pub async fn seeded_context(
    store: Arc<dyn KvStore>,
    simulation: SimulationConfig,
    seed: u64,
) -> AppContext {
    AppContext::builder(JetStreamConfig::default())
        .store(store)
        .executor(Arc::new(SimulatedExecutor::with_seed(simulation, seed)))
        .build()
        .await
        .expect("context should build")
}
