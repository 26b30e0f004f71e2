//! Workflow records and the run state machine

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Identifier of a workflow: its creation time in ms, as a decimal string
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkflowId(String);

impl WorkflowId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<i64> for WorkflowId {
    fn from(value: i64) -> Self {
        Self(value.to_string())
    }
}

impl From<&str> for WorkflowId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for WorkflowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Returned when a wire id names no known variant
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} '{value}', expected one of: {expected}")]
pub struct UnknownVariant {
    kind: &'static str,
    value: String,
    expected: String,
}

impl UnknownVariant {
    fn new(kind: &'static str, value: &str, expected: &[&str]) -> Self {
        Self {
            kind,
            value: value.to_string(),
            expected: expected.join(", "),
        }
    }
}

/// The kind of office task a workflow performs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WorkflowKind {
    WordToPdf,
    ExcelMerge,
    EmailSummary,
    ArchiveAttachments,
}

impl WorkflowKind {
    /// Catalog order
    pub const ALL: [WorkflowKind; 4] = [
        WorkflowKind::WordToPdf,
        WorkflowKind::ExcelMerge,
        WorkflowKind::EmailSummary,
        WorkflowKind::ArchiveAttachments,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            WorkflowKind::WordToPdf => "word-to-pdf",
            WorkflowKind::ExcelMerge => "excel-merge",
            WorkflowKind::EmailSummary => "email-summary",
            WorkflowKind::ArchiveAttachments => "archive-attachments",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            WorkflowKind::WordToPdf => "Word to PDF Converter",
            WorkflowKind::ExcelMerge => "Excel Report Merger",
            WorkflowKind::EmailSummary => "Email Summary Generator",
            WorkflowKind::ArchiveAttachments => "Attachment Archiver",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            WorkflowKind::WordToPdf => "Automatically convert Word documents to PDF format",
            WorkflowKind::ExcelMerge => "Combine multiple Excel files into consolidated reports",
            WorkflowKind::EmailSummary => "Generate and send automated summary emails",
            WorkflowKind::ArchiveAttachments => {
                "Automatically archive and organize email attachments"
            }
        }
    }
}

impl fmt::Display for WorkflowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkflowKind {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| {
                UnknownVariant::new("workflow type", s, &Self::ALL.map(WorkflowKind::as_str))
            })
    }
}

/// Declared trigger cadence.
///
/// Purely descriptive: nothing fires a workflow on its schedule, runs are
/// always started explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Schedule {
    #[default]
    Manual,
    Hourly,
    Daily,
    Weekly,
    Monthly,
}

impl Schedule {
    pub const ALL: [Schedule; 5] = [
        Schedule::Manual,
        Schedule::Hourly,
        Schedule::Daily,
        Schedule::Weekly,
        Schedule::Monthly,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Schedule::Manual => "manual",
            Schedule::Hourly => "hourly",
            Schedule::Daily => "daily",
            Schedule::Weekly => "weekly",
            Schedule::Monthly => "monthly",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Schedule::Manual => "Manual Trigger",
            Schedule::Hourly => "Every Hour",
            Schedule::Daily => "Daily at 9 AM",
            Schedule::Weekly => "Weekly (Monday)",
            Schedule::Monthly => "Monthly (1st)",
        }
    }
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Schedule {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|schedule| schedule.as_str() == s)
            .ok_or_else(|| UnknownVariant::new("schedule", s, &Self::ALL.map(Schedule::as_str)))
    }
}

/// Workflow run status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowStatus {
    #[default]
    Ready,
    Running,
    Success,
    Failed,
}

impl WorkflowStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            WorkflowStatus::Ready => "ready",
            WorkflowStatus::Running => "running",
            WorkflowStatus::Success => "success",
            WorkflowStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of executing a workflow once
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    Success { files_processed: u64 },
    Failure { reason: String },
}

impl ExecutionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ExecutionOutcome::Success { .. })
    }
}

/// User-supplied fields for a new workflow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowDraft {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: WorkflowKind,
    pub schedule: Schedule,
    pub enabled: bool,
}

impl Default for WorkflowDraft {
    fn default() -> Self {
        Self {
            name: String::new(),
            kind: WorkflowKind::WordToPdf,
            schedule: Schedule::Manual,
            enabled: true,
        }
    }
}

impl WorkflowDraft {
    pub fn new(name: impl Into<String>, kind: WorkflowKind) -> Self {
        Self {
            name: name.into(),
            kind,
            ..Default::default()
        }
    }

    pub fn with_schedule(mut self, schedule: Schedule) -> Self {
        self.schedule = schedule;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

/// Persisted workflow definition plus its run counters.
///
/// Invariant: `run_count == success_count + failure_count`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workflow {
    pub id: WorkflowId,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: WorkflowKind,
    pub schedule: Schedule,
    pub enabled: bool,
    pub status: WorkflowStatus,
    pub created: i64,
    #[serde(default)]
    pub last_run: Option<i64>,
    #[serde(default)]
    pub run_count: u64,
    #[serde(default)]
    pub success_count: u64,
    #[serde(default)]
    pub failure_count: u64,
}

impl Workflow {
    /// Materialize a draft created at `created` (ms), which also becomes the id
    pub fn from_draft(draft: WorkflowDraft, created: i64) -> Self {
        Self {
            id: WorkflowId::from(created),
            name: draft.name,
            kind: draft.kind,
            schedule: draft.schedule,
            enabled: draft.enabled,
            status: WorkflowStatus::Ready,
            created,
            last_run: None,
            run_count: 0,
            success_count: 0,
            failure_count: 0,
        }
    }

    /// Disabled and already-running workflows cannot start
    pub fn can_run(&self) -> bool {
        self.enabled && self.status != WorkflowStatus::Running
    }

    /// Copy in the `running` state, stamped with the start time
    pub fn started(&self, at: i64) -> Self {
        Self {
            status: WorkflowStatus::Running,
            last_run: Some(at),
            ..self.clone()
        }
    }

    /// Copy back in the `ready` state after a run that never resolved.
    /// Counters are left alone since the run was never counted.
    pub fn interrupted(&self) -> Self {
        Self {
            status: WorkflowStatus::Ready,
            ..self.clone()
        }
    }

    /// Copy with the outcome folded into status and counters
    pub fn resolved(&self, outcome: &ExecutionOutcome) -> Self {
        let mut next = self.clone();
        next.run_count += 1;
        if outcome.is_success() {
            next.status = WorkflowStatus::Success;
            next.success_count += 1;
        } else {
            next.status = WorkflowStatus::Failed;
            next.failure_count += 1;
        }
        next
    }

    /// Copy with `enabled` flipped and nothing else touched
    pub fn toggled(&self) -> Self {
        Self {
            enabled: !self.enabled,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn sample() -> Workflow {
        Workflow::from_draft(
            WorkflowDraft::new("Daily Report", WorkflowKind::WordToPdf)
                .with_schedule(Schedule::Daily),
            1_700_000_000_000,
        )
    }

    #[test]
    fn test_from_draft_initial_state() {
        let wf = sample();
        assert_eq!(wf.id.as_str(), "1700000000000");
        assert_eq!(wf.created, 1_700_000_000_000);
        assert_eq!(wf.status, WorkflowStatus::Ready);
        assert_eq!(wf.last_run, None);
        assert_eq!((wf.run_count, wf.success_count, wf.failure_count), (0, 0, 0));
        assert!(wf.enabled);
    }

    #[test]
    fn test_wire_format() {
        let value = serde_json::to_value(sample()).unwrap();
        assert_eq!(
            value,
            json!({
                "id": "1700000000000",
                "name": "Daily Report",
                "type": "word-to-pdf",
                "schedule": "daily",
                "enabled": true,
                "status": "ready",
                "created": 1_700_000_000_000_i64,
                "lastRun": null,
                "runCount": 0,
                "successCount": 0,
                "failureCount": 0
            })
        );
    }

    #[test]
    fn test_decode_record_without_counters() {
        let wf: Workflow = serde_json::from_value(json!({
            "id": "5",
            "name": "Archive",
            "type": "archive-attachments",
            "schedule": "monthly",
            "enabled": false,
            "status": "failed",
            "created": 5
        }))
        .unwrap();
        assert_eq!(wf.kind, WorkflowKind::ArchiveAttachments);
        assert_eq!(wf.run_count, 0);
        assert_eq!(wf.last_run, None);
    }

    #[test]
    fn test_run_state_machine_keeps_counter_invariant() {
        let mut wf = sample();
        let outcomes = [
            ExecutionOutcome::Success { files_processed: 7 },
            ExecutionOutcome::Failure {
                reason: "Connection timeout".to_string(),
            },
            ExecutionOutcome::Success { files_processed: 9 },
        ];

        for (i, outcome) in outcomes.iter().enumerate() {
            assert!(wf.can_run());
            let running = wf.started(10 + i as i64);
            assert_eq!(running.status, WorkflowStatus::Running);
            assert_eq!(running.last_run, Some(10 + i as i64));
            assert!(!running.can_run());

            wf = running.resolved(outcome);
            assert_eq!(wf.run_count, wf.success_count + wf.failure_count);
        }

        assert_eq!(wf.status, WorkflowStatus::Success);
        assert_eq!((wf.run_count, wf.success_count, wf.failure_count), (3, 2, 1));
    }

    #[test]
    fn test_interrupted_run_becomes_runnable() {
        let running = sample().started(42);
        let reset = running.interrupted();
        assert_eq!(reset.status, WorkflowStatus::Ready);
        assert_eq!(reset.last_run, Some(42));
        assert_eq!(reset.run_count, 0);
        assert!(reset.can_run());
    }

    #[test]
    fn test_toggled_only_flips_enabled() {
        let wf = sample();
        let toggled = wf.toggled();
        assert_eq!(toggled.enabled, !wf.enabled);
        assert_eq!(
            Workflow {
                enabled: wf.enabled,
                ..toggled.clone()
            },
            wf
        );
        assert!(!toggled.can_run());
    }

    #[test]
    fn test_parse_kinds_and_schedules() {
        assert_eq!(
            "excel-merge".parse::<WorkflowKind>().unwrap(),
            WorkflowKind::ExcelMerge
        );
        assert_eq!("weekly".parse::<Schedule>().unwrap(), Schedule::Weekly);

        let err = "pdf".parse::<WorkflowKind>().unwrap_err();
        assert!(err.to_string().contains("word-to-pdf"));
        assert!("yearly".parse::<Schedule>().is_err());
    }

    #[test]
    fn test_draft_defaults() {
        let draft = WorkflowDraft::default();
        assert!(draft.name.is_empty());
        assert_eq!(draft.kind, WorkflowKind::WordToPdf);
        assert_eq!(draft.schedule, Schedule::Manual);
        assert!(draft.enabled);
    }
}
