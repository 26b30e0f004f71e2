//! Time-based identifiers shared by workflows and log entries.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;

/// Current wall-clock time in milliseconds since the Unix epoch.
#[inline]
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Hands out millisecond timestamps that double as record ids.
///
/// Values track the wall clock but never repeat: two calls within the same
/// millisecond (or after the clock stepped backwards) yield `last + 1`.
#[derive(Debug, Default)]
pub struct IdGenerator {
    last: AtomicI64,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next strictly increasing timestamp.
    pub fn next(&self) -> i64 {
        let now = now_millis();
        let mut current = self.last.load(Ordering::Acquire);
        loop {
            let candidate = now.max(current + 1);
            match self.last.compare_exchange_weak(
                current,
                candidate,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return candidate,
                Err(actual) => current = actual,
            }
        }
    }

    /// Record a value already in use so later ids stay above it.
    pub fn observe(&self, value: i64) {
        self.last.fetch_max(value, Ordering::AcqRel);
    }
}
