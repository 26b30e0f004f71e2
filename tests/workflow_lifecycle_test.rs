//! End-to-end workflow lifecycle over the simulated executor

mod common;

use std::{sync::Arc, time::Duration};

use chrono::NaiveDate;
use common::{FlakyStore, seeded_context};
use jetstream::{
    activity::{LogLevel, decode_export},
    config::SimulationConfig,
    store::{KvStore, LOG_PREFIX, MemoryStore, WORKFLOW_PREFIX, workflow_key},
    workflow::{Schedule, Workflow, WorkflowDraft, WorkflowError, WorkflowKind, WorkflowStatus},
};
use tokio::time::Instant;

#[tokio::test(start_paused = true)]
async fn test_daily_report_scenario() {
    let store = MemoryStore::new();
    let ctx = seeded_context(Arc::new(store.clone()), SimulationConfig::default(), 1).await;

    let wf = ctx
        .registry
        .create(
            WorkflowDraft::new("Daily Report", WorkflowKind::WordToPdf)
                .with_schedule(Schedule::Daily)
                .with_enabled(true),
        )
        .await
        .unwrap();
    assert_eq!(wf.status, WorkflowStatus::Ready);
    assert_eq!(wf.run_count, 0);

    let started = Instant::now();
    let handle = ctx.runner.run(&wf.id).await.unwrap().expect("run should start");
    let finished = handle.wait().await.unwrap();
    let elapsed = started.elapsed();

    assert!(elapsed >= Duration::from_millis(2000));
    assert!(elapsed < Duration::from_millis(5000));
    assert!(matches!(
        finished.status,
        WorkflowStatus::Success | WorkflowStatus::Failed
    ));
    assert_eq!(finished.run_count, 1);

    let log = &ctx.activity.entries()[0];
    assert!(matches!(log.level, LogLevel::Success | LogLevel::Error));
    assert!(log.message.contains("Daily Report"));

    // Persisted record matches the mirror
    let raw = store.get(&workflow_key(wf.id.as_str())).await.unwrap().unwrap();
    assert_eq!(serde_json::from_str::<Workflow>(&raw).unwrap(), finished);
    assert!(ctx.shutdown().await);
}

#[tokio::test(start_paused = true)]
async fn test_counters_stay_consistent_across_runs() {
    let ctx = seeded_context(
        Arc::new(MemoryStore::new()),
        SimulationConfig {
            failure_rate: 0.5,
            ..Default::default()
        },
        99,
    )
    .await;

    let mut ids = Vec::new();
    for kind in WorkflowKind::ALL {
        let wf = ctx
            .registry
            .create(WorkflowDraft::new(format!("{kind} job"), kind))
            .await
            .unwrap();
        ids.push(wf.id);
    }

    for _ in 0..10 {
        // All four run concurrently
        let mut handles = Vec::new();
        for id in &ids {
            handles.push(ctx.runner.run(id).await.unwrap().unwrap());
        }
        for handle in handles {
            let wf = handle.wait().await.unwrap();
            assert_eq!(wf.run_count, wf.success_count + wf.failure_count);
        }
    }

    let stats = ctx.stats();
    assert_eq!(stats.total, 4);
    assert_eq!(stats.total_runs, 40);
    for wf in ctx.registry.snapshot() {
        assert_eq!(wf.run_count, 10);
        assert_eq!(wf.run_count, wf.success_count + wf.failure_count);
    }
}

#[tokio::test(start_paused = true)]
async fn test_disabled_run_changes_nothing() {
    let ctx = seeded_context(Arc::new(MemoryStore::new()), SimulationConfig::default(), 5).await;
    let wf = ctx
        .registry
        .create(WorkflowDraft::new("Paused", WorkflowKind::ExcelMerge).with_enabled(false))
        .await
        .unwrap();
    let logs_before = ctx.activity.entries();

    assert!(ctx.runner.run(&wf.id).await.unwrap().is_none());
    tokio::time::sleep(Duration::from_secs(10)).await;

    assert_eq!(ctx.registry.get(&wf.id).unwrap(), wf);
    assert_eq!(ctx.activity.entries(), logs_before);
}

#[tokio::test]
async fn test_unreachable_store_at_startup_is_a_fresh_start() {
    let store = FlakyStore::new();
    store.set_down(true);
    let ctx = seeded_context(Arc::new(store.clone()), SimulationConfig::default(), 0).await;

    assert!(ctx.registry.is_empty());
    assert!(ctx.activity.is_empty());
    // The explicit listing still reports the failure
    assert!(ctx.registry.list().await.is_err());
}

#[tokio::test]
async fn test_create_fails_cleanly_when_store_is_down() {
    let store = FlakyStore::new();
    let ctx = seeded_context(Arc::new(store.clone()), SimulationConfig::default(), 0).await;

    store.set_down(true);
    let result = ctx
        .registry
        .create(WorkflowDraft::new("Unsaved", WorkflowKind::WordToPdf))
        .await;
    assert!(matches!(result, Err(WorkflowError::Store(_))));
    assert!(ctx.registry.is_empty());
    assert!(ctx.activity.is_empty());

    store.set_down(false);
    assert!(store.inner().list(WORKFLOW_PREFIX).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_blank_name_never_persists() {
    let store = MemoryStore::new();
    let ctx = seeded_context(Arc::new(store.clone()), SimulationConfig::default(), 0).await;

    let result = ctx
        .registry
        .create(WorkflowDraft::new("   ", WorkflowKind::WordToPdf))
        .await;
    assert!(matches!(result, Err(WorkflowError::Validation(_))));
    assert_eq!(ctx.registry.len(), 0);
    assert!(store.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_export_after_activity_round_trips() {
    let store = MemoryStore::new();
    let ctx = seeded_context(Arc::new(store.clone()), SimulationConfig::default(), 8).await;

    let wf = ctx
        .registry
        .create(WorkflowDraft::new("Archive", WorkflowKind::ArchiveAttachments))
        .await
        .unwrap();
    ctx.runner.run(&wf.id).await.unwrap().unwrap().wait().await;
    ctx.registry.toggle_enabled(&wf.id).await.unwrap();
    ctx.registry.delete(&wf.id).await.unwrap();

    let export = ctx
        .activity
        .export(NaiveDate::from_ymd_opt(2024, 12, 31).unwrap())
        .unwrap();
    assert_eq!(export.file_name, "jetstream-logs-2024-12-31.json");

    let decoded = decode_export(&export.contents).unwrap();
    assert_eq!(decoded, ctx.activity.entries());
    let messages: Vec<_> = decoded.iter().map(|e| e.message.as_str()).collect();
    assert_eq!(messages[0], "Deleted workflow");
    assert_eq!(messages[1], "Disabled workflow: Archive");
    assert_eq!(*messages.last().unwrap(), "Created workflow: Archive");

    // Clearing wipes persisted logs and leaves a single marker entry
    ctx.activity.clear().await.unwrap();
    assert_eq!(ctx.activity.len(), 1);
    assert_eq!(store.list(LOG_PREFIX).await.unwrap().len(), 1);
}
