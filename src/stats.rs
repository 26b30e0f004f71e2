//! Aggregate figures derived from the current workflow set

use serde::Serialize;

use crate::workflow::{Workflow, WorkflowKind};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total: usize,
    pub enabled: usize,
    pub total_runs: u64,
    /// Percentage of successful runs, one decimal; 0 when nothing ran
    pub success_rate: f64,
    /// Workflow count per kind, in catalog order
    pub by_kind: Vec<(WorkflowKind, usize)>,
}

impl DashboardStats {
    pub fn from_workflows(workflows: &[Workflow]) -> Self {
        let total_runs: u64 = workflows.iter().map(|w| w.run_count).sum();
        let total_success: u64 = workflows.iter().map(|w| w.success_count).sum();
        let success_rate = if total_runs > 0 {
            round_one_decimal(total_success as f64 / total_runs as f64 * 100.0)
        } else {
            0.0
        };

        Self {
            total: workflows.len(),
            enabled: workflows.iter().filter(|w| w.enabled).count(),
            total_runs,
            success_rate,
            by_kind: WorkflowKind::ALL
                .into_iter()
                .map(|kind| (kind, workflows.iter().filter(|w| w.kind == kind).count()))
                .collect(),
        }
    }
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
