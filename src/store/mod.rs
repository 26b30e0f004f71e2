//! Key-value persistence for workflows and log entries.
//!
//! Every record lives under a namespaced string key (`workflow:<id>`,
//! `log:<id>`) with a JSON-encoded value, so both record kinds can share one
//! store and be told apart with a prefix listing.
//!
//! Structure:
//! 1. Errors and the `KvStore` trait
//! 2. Prefix loading helpers
//! 3. Backends (`memory`, `file`)

mod file;
mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

pub use file::FileStore;
pub use memory::MemoryStore;

/// Key prefix for workflow records
pub const WORKFLOW_PREFIX: &str = "workflow:";
/// Key prefix for log records
pub const LOG_PREFIX: &str = "log:";

pub fn workflow_key(id: &str) -> String {
    format!("{WORKFLOW_PREFIX}{id}")
}

pub fn log_key(id: &str) -> String {
    format!("{LOG_PREFIX}{id}")
}

// ============================================================================
// PART 1: Errors and trait
// ============================================================================

/// Error type for store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Codec error: {0}")]
    Codec(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Async string key-value store consumed by the registry and the log recorder.
#[async_trait]
pub trait KvStore: Send + Sync + 'static {
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    async fn set(&self, key: &str, value: String) -> StoreResult<()>;

    async fn delete(&self, key: &str) -> StoreResult<()>;

    /// Keys starting with `prefix`, in no particular order
    async fn list(&self, prefix: &str) -> StoreResult<Vec<String>>;
}

pub type SharedKvStore = Arc<dyn KvStore>;

// ============================================================================
// PART 2: Prefix loading
// ============================================================================

/// Records decoded from a prefix listing.
///
/// `skipped` counts keys that were listed but could not be read or decoded;
/// those are dropped so one bad record never hides the rest.
#[derive(Debug, Clone, PartialEq)]
pub struct Listing<T> {
    pub records: Vec<T>,
    pub skipped: usize,
}

impl<T> Listing<T> {
    pub fn empty() -> Self {
        Self {
            records: Vec::new(),
            skipped: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Fetch and decode every record stored under `prefix`.
///
/// Fails only when the listing itself fails.
pub async fn load_prefixed<T: DeserializeOwned>(
    store: &dyn KvStore,
    prefix: &str,
) -> StoreResult<Listing<T>> {
    let keys = store.list(prefix).await?;
    let fetched = join_all(keys.iter().map(|key| store.get(key))).await;

    let mut listing = Listing::empty();
    for (key, value) in keys.iter().zip(fetched) {
        match value {
            Ok(Some(raw)) => match serde_json::from_str::<T>(&raw) {
                Ok(record) => listing.records.push(record),
                Err(e) => {
                    warn!(key = %key, error = %e, "Dropping undecodable record");
                    listing.skipped += 1;
                }
            },
            // Deleted between list and get
            Ok(None) => debug!(key = %key, "Record vanished during listing"),
            Err(e) => {
                warn!(key = %key, error = %e, "Dropping unreadable record");
                listing.skipped += 1;
            }
        }
    }
    Ok(listing)
}
