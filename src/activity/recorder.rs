use std::collections::VecDeque;

use chrono::NaiveDate;
use futures::future::try_join_all;
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use super::{LogDetails, LogEntry, LogExport, LogLevel, export::export_file_name};
use crate::{
    store::{LOG_PREFIX, Listing, SharedKvStore, StoreResult, load_prefixed, log_key},
    utils::IdGenerator,
};

/// Default number of entries kept in memory
pub const DEFAULT_LOG_CAPACITY: usize = 100;

/// Persists log entries one key each and mirrors the newest `capacity` of
/// them in memory, newest first.
///
/// The store is never pruned to the capacity; older entries stay persisted
/// until `clear`.
pub struct LogRecorder {
    store: SharedKvStore,
    ids: IdGenerator,
    capacity: usize,
    entries: RwLock<VecDeque<LogEntry>>,
}

impl LogRecorder {
    pub fn new(store: SharedKvStore, capacity: usize) -> Self {
        Self {
            store,
            ids: IdGenerator::new(),
            capacity: capacity.max(1),
            entries: RwLock::new(VecDeque::with_capacity(capacity.max(1))),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Replace the mirror with the newest persisted entries.
    pub async fn load(&self) -> StoreResult<Listing<LogEntry>> {
        let mut listing = load_prefixed::<LogEntry>(self.store.as_ref(), LOG_PREFIX).await?;
        listing
            .records
            .sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| b.id.cmp(&a.id)));
        if let Some(newest) = listing.records.first() {
            self.ids.observe(newest.timestamp);
        }
        listing.records.truncate(self.capacity);

        *self.entries.write() = listing.records.iter().cloned().collect();
        debug!(
            loaded = listing.records.len(),
            skipped = listing.skipped,
            "Loaded activity log"
        );
        Ok(listing)
    }

    /// Persist a new entry, then mirror it.
    ///
    /// On a store failure nothing is mirrored.
    pub async fn append(
        &self,
        level: LogLevel,
        message: impl Into<String>,
        details: LogDetails,
    ) -> StoreResult<LogEntry> {
        let entry = LogEntry::new(self.ids.next(), level, message, details);
        let encoded = serde_json::to_string(&entry)?;
        self.store.set(&log_key(&entry.id), encoded).await?;

        let mut entries = self.entries.write();
        // Concurrent appends may persist out of order; keep newest first
        let pos = entries
            .iter()
            .position(|e| e.timestamp < entry.timestamp)
            .unwrap_or(entries.len());
        entries.insert(pos, entry.clone());
        entries.truncate(self.capacity);
        Ok(entry)
    }

    /// Best-effort `append`: failures only reach the diagnostic log.
    pub async fn record(
        &self,
        level: LogLevel,
        message: impl Into<String>,
        details: LogDetails,
    ) -> Option<LogEntry> {
        let message = message.into();
        match self.append(level, message.clone(), details).await {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(level = %level, message = %message, error = %e, "Failed to add log");
                None
            }
        }
    }

    /// Delete every persisted entry and empty the mirror, then log the
    /// clearing itself. Returns the number of deleted records.
    ///
    /// If the listing or any delete fails the mirror is left as it was.
    pub async fn clear(&self) -> StoreResult<usize> {
        let keys = self.store.list(LOG_PREFIX).await?;
        try_join_all(keys.iter().map(|key| self.store.delete(key))).await?;

        self.entries.write().clear();
        info!(deleted = keys.len(), "Cleared activity log");

        self.record(LogLevel::Info, "Logs cleared", LogDetails::new())
            .await;
        Ok(keys.len())
    }

    /// Snapshot of the mirror, newest first
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.read().iter().cloned().collect()
    }

    pub fn recent(&self, limit: usize) -> Vec<LogEntry> {
        self.entries.read().iter().take(limit).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Serialize the whole mirror as a JSON document named after `date`.
    pub fn export(&self, date: NaiveDate) -> serde_json::Result<LogExport> {
        let entries = self.entries();
        Ok(LogExport {
            file_name: export_file_name(date),
            contents: serde_json::to_string_pretty(&entries)?,
        })
    }
}

impl std::fmt::Debug for LogRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogRecorder")
            .field("capacity", &self.capacity)
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::{
        activity::decode_export,
        store::{KvStore, MemoryStore},
    };

    fn recorder_with(capacity: usize) -> (MemoryStore, LogRecorder) {
        let store = MemoryStore::new();
        let recorder = LogRecorder::new(Arc::new(store.clone()), capacity);
        (store, recorder)
    }

    #[tokio::test]
    async fn test_append_persists_and_prepends() {
        let (store, recorder) = recorder_with(DEFAULT_LOG_CAPACITY);

        let first = recorder
            .append(LogLevel::Info, "first", LogDetails::new())
            .await
            .unwrap();
        let mut details = LogDetails::new();
        details.insert("duration".to_string(), json!(2500));
        let second = recorder
            .append(LogLevel::Success, "second", details)
            .await
            .unwrap();

        assert!(second.timestamp > first.timestamp);
        assert_eq!(second.id, second.timestamp.to_string());
        let entries = recorder.entries();
        assert_eq!(entries, vec![second.clone(), first.clone()]);

        let raw = store.get(&log_key(&second.id)).await.unwrap().unwrap();
        let decoded: LogEntry = serde_json::from_str(&raw).unwrap();
        assert_eq!(decoded, second);
        assert_eq!(decoded.details["duration"], json!(2500));
    }

    #[tokio::test]
    async fn test_mirror_never_exceeds_capacity() {
        let (store, recorder) = recorder_with(DEFAULT_LOG_CAPACITY);

        for i in 0..150 {
            recorder
                .append(LogLevel::Info, format!("event {i}"), LogDetails::new())
                .await
                .unwrap();
            assert!(recorder.len() <= DEFAULT_LOG_CAPACITY);
        }

        assert_eq!(recorder.len(), DEFAULT_LOG_CAPACITY);
        assert_eq!(recorder.entries()[0].message, "event 149");
        // The store keeps everything
        assert_eq!(store.list(LOG_PREFIX).await.unwrap().len(), 150);
    }

    #[tokio::test]
    async fn test_load_keeps_newest_and_skips_malformed() {
        let (store, recorder) = recorder_with(2);
        for ts in [10_i64, 30, 20] {
            let entry = LogEntry::new(ts, LogLevel::Info, format!("at {ts}"), LogDetails::new());
            store
                .set(&log_key(&entry.id), serde_json::to_string(&entry).unwrap())
                .await
                .unwrap();
        }
        store.set("log:bad", "{".to_string()).await.unwrap();

        let listing = recorder.load().await.unwrap();
        assert_eq!(listing.skipped, 1);

        let timestamps: Vec<_> = recorder.entries().iter().map(|e| e.timestamp).collect();
        assert_eq!(timestamps, vec![30, 20]);
    }

    #[tokio::test]
    async fn test_clear_on_empty_log_leaves_single_entry() {
        let (store, recorder) = recorder_with(DEFAULT_LOG_CAPACITY);

        let deleted = recorder.clear().await.unwrap();
        assert_eq!(deleted, 0);

        let entries = recorder.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].message, "Logs cleared");
        assert_eq!(entries[0].level, LogLevel::Info);
        assert_eq!(store.list(LOG_PREFIX).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_clear_removes_persisted_entries() {
        let (store, recorder) = recorder_with(3);
        for i in 0..5 {
            recorder
                .append(LogLevel::Error, format!("failure {i}"), LogDetails::new())
                .await
                .unwrap();
        }

        assert_eq!(recorder.clear().await.unwrap(), 5);
        assert_eq!(recorder.len(), 1);
        let keys = store.list(LOG_PREFIX).await.unwrap();
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0], log_key(&recorder.entries()[0].id));
    }

    #[tokio::test]
    async fn test_export_decodes_to_mirror() {
        let (_store, recorder) = recorder_with(DEFAULT_LOG_CAPACITY);
        for level in [LogLevel::Info, LogLevel::Success, LogLevel::Error] {
            let mut details = LogDetails::new();
            details.insert("workflowId".to_string(), json!("1"));
            recorder.append(level, level.as_str(), details).await.unwrap();
        }

        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        let export = recorder.export(date).unwrap();
        assert_eq!(export.file_name, "jetstream-logs-2024-03-09.json");
        assert_eq!(decode_export(&export.contents).unwrap(), recorder.entries());
    }
}
