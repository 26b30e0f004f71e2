//! Plain-text views over the registry and the activity log.

use chrono::{DateTime, Local};

use crate::{
    activity::{LogEntry, LogLevel},
    stats::DashboardStats,
    workflow::{Workflow, WorkflowKind, WorkflowStatus},
};

/// Entries shown under "Recent Activity"
pub const RECENT_ACTIVITY_LIMIT: usize = 10;

pub fn format_timestamp(ms: i64) -> String {
    match DateTime::from_timestamp_millis(ms) {
        Some(utc) => utc
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string(),
        None => ms.to_string(),
    }
}

fn level_marker(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Success => "[ok]  ",
        LogLevel::Error => "[err] ",
        LogLevel::Info => "[info]",
    }
}

fn status_marker(status: WorkflowStatus) -> &'static str {
    match status {
        WorkflowStatus::Ready => "ready",
        WorkflowStatus::Running => "running...",
        WorkflowStatus::Success => "success",
        WorkflowStatus::Failed => "failed",
    }
}

pub fn render_log_entry(entry: &LogEntry) -> String {
    let mut line = format!(
        "{} {}  {}",
        level_marker(entry.level),
        format_timestamp(entry.timestamp),
        entry.message
    );
    if !entry.details.is_empty() {
        if let Ok(details) = serde_json::to_string(&entry.details) {
            line.push_str("  ");
            line.push_str(&details);
        }
    }
    line
}

pub fn render_workflow(workflow: &Workflow) -> String {
    let mut lines = vec![
        format!(
            "{}  {}  [{}]",
            workflow.id,
            workflow.name,
            status_marker(workflow.status)
        ),
        format!(
            "    {} | {} | {}",
            workflow.kind.display_name(),
            workflow.schedule.label(),
            if workflow.enabled { "Enabled" } else { "Disabled" }
        ),
        format!(
            "    runs: {}  success: {}  failed: {}",
            workflow.run_count, workflow.success_count, workflow.failure_count
        ),
    ];
    if let Some(last_run) = workflow.last_run {
        lines.push(format!("    last run: {}", format_timestamp(last_run)));
    }
    lines.join("\n")
}

pub fn render_workflows(workflows: &[Workflow]) -> String {
    if workflows.is_empty() {
        return "No workflows yet. Create one with `jetstream create`.".to_string();
    }
    workflows
        .iter()
        .map(render_workflow)
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn render_logs(entries: &[LogEntry]) -> String {
    if entries.is_empty() {
        return "No activity yet.".to_string();
    }
    entries
        .iter()
        .map(render_log_entry)
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_stats(stats: &DashboardStats) -> String {
    format!(
        "Workflows: {}   Enabled: {}   Total runs: {}   Success rate: {:.1}%",
        stats.total, stats.enabled, stats.total_runs, stats.success_rate
    )
}

pub fn render_catalog() -> String {
    WorkflowKind::ALL
        .iter()
        .map(|kind| {
            format!(
                "{:<20} {}\n{:<20} {}",
                kind.as_str(),
                kind.display_name(),
                "",
                kind.description()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_dashboard(stats: &DashboardStats, recent: &[LogEntry]) -> String {
    let mut sections = vec![
        "JetStream - Office Workflow Automation Suite".to_string(),
        render_stats(stats),
        String::new(),
        "Workflow Types".to_string(),
    ];
    for (kind, count) in &stats.by_kind {
        sections.push(format!("  {:<26} {}", kind.display_name(), count));
    }
    sections.push(String::new());
    sections.push("Recent Activity".to_string());
    let limit = recent.len().min(RECENT_ACTIVITY_LIMIT);
    sections.push(render_logs(&recent[..limit]));
    sections.join("\n")
}
