//! Activity log: structured events about workflow changes and runs

mod export;
mod recorder;

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value};

pub use export::{LogExport, decode_export, export_file_name};
pub use recorder::{DEFAULT_LOG_CAPACITY, LogRecorder};

/// Free-form event payload (duration, filesProcessed, error reason, ...)
pub type LogDetails = JsonMap<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Success,
    Error,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Info => "info",
            LogLevel::Success => "success",
            LogLevel::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: String,
    pub timestamp: i64,
    #[serde(rename = "type")]
    pub level: LogLevel,
    pub message: String,
    #[serde(default)]
    pub details: LogDetails,
}

impl LogEntry {
    pub fn new(
        timestamp: i64,
        level: LogLevel,
        message: impl Into<String>,
        details: LogDetails,
    ) -> Self {
        Self {
            id: timestamp.to_string(),
            timestamp,
            level,
            message: message.into(),
            details,
        }
    }
}
