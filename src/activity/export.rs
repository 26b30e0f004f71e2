use chrono::NaiveDate;

use super::LogEntry;

/// A downloadable snapshot of the activity log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogExport {
    pub file_name: String,
    pub contents: String,
}

/// `jetstream-logs-<YYYY-MM-DD>.json`
pub fn export_file_name(date: NaiveDate) -> String {
    format!("jetstream-logs-{}.json", date.format("%Y-%m-%d"))
}

/// Parse an exported document back into its entries, in document order.
pub fn decode_export(contents: &str) -> serde_json::Result<Vec<LogEntry>> {
    serde_json::from_str(contents)
}
