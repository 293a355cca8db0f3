// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use hive_core::{TaskId, TaskStatus};

#[tokio::test(start_paused = true)]
async fn start_runs_until_queue_drains_then_shuts_down() {
    let (harness, mut orchestrator) = harness_with(OrchestratorConfig {
        idle_settling_ms: 0,
        tick_interval_ms: 100,
        ..OrchestratorConfig::default()
    });
    orchestrator.queue_task(task("t-1")).await;

    orchestrator.start().await;

    assert!(orchestrator.is_task_completed(&TaskId::new("t-1")));
    assert!(!orchestrator.is_running());
    // Shutdown killed the session and cleared the snapshot
    assert!(!harness.mux.session_exists().await.unwrap());
    let raw = std::fs::read_to_string(harness.dir.path().join("orchestration-state.json")).unwrap();
    let state: crate::session_state::SessionState = serde_json::from_str(&raw).unwrap();
    assert_eq!(state.status, "stopped");
    assert!(state.workers.is_empty());
}

#[tokio::test(start_paused = true)]
async fn disabled_config_refuses_to_start() {
    let (_harness, mut orchestrator) = harness_with(OrchestratorConfig {
        enabled: false,
        ..OrchestratorConfig::default()
    });
    orchestrator.queue_task(task("t-1")).await;

    orchestrator.start().await;

    assert!(!orchestrator.is_running());
    assert_eq!(orchestrator.pending_count(), 1, "nothing was dispatched");
    assert_eq!(orchestrator.worker_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn snapshot_reflects_live_workers_while_running() {
    let (harness, mut orchestrator) = harness();
    orchestrator.queue_task(task("t-1")).await;
    orchestrator.queue_task(task("t-2")).await;
    orchestrator.tick().await;

    let raw = std::fs::read_to_string(harness.dir.path().join("orchestration-state.json")).unwrap();
    let state: crate::session_state::SessionState = serde_json::from_str(&raw).unwrap();
    assert_eq!(state.status, "running");
    assert_eq!(state.workers.len(), 2);
    assert_eq!(state.pending_task_count, 0);
    let worker = &state.workers[0];
    assert!(worker.task_id.is_some());
    assert!(worker.task_prompt.as_deref().is_some());
}

#[tokio::test(start_paused = true)]
async fn shutdown_cancels_pending_and_stops_workers_idempotently() {
    let (harness, mut orchestrator) = harness_with(OrchestratorConfig {
        max_workers: 1,
        ..OrchestratorConfig::default()
    });
    orchestrator.queue_task(task("t-1")).await;
    orchestrator.queue_task(task("t-2")).await;
    orchestrator.tick().await;
    assert_eq!(orchestrator.pending_count(), 1);

    orchestrator.shutdown().await;
    orchestrator.shutdown().await; // idempotent

    assert_eq!(orchestrator.worker_count(), 0);
    assert_eq!(orchestrator.pending_count(), 0);
    assert_eq!(
        harness.store.latest("t-2").unwrap().status,
        TaskStatus::Cancelled
    );
    // t-1 was assigned, not pending: its last persisted status is running
    assert_eq!(
        harness.store.latest("t-1").unwrap().status,
        TaskStatus::Running
    );
    assert!(!harness.mux.session_exists().await.unwrap());
}

#[tokio::test(start_paused = true)]
async fn queue_after_completion_reuses_the_engine() {
    let (harness, mut orchestrator) = harness_with(OrchestratorConfig {
        idle_settling_ms: 1_000,
        ..OrchestratorConfig::default()
    });
    orchestrator.queue_task(task("t-1")).await;
    for _ in 0..4 {
        advance_and_tick(&harness, &mut orchestrator, 3_000).await;
    }
    assert!(orchestrator.is_task_completed(&TaskId::new("t-1")));

    orchestrator.queue_task(task("t-2")).await;
    for _ in 0..4 {
        advance_and_tick(&harness, &mut orchestrator, 3_000).await;
    }
    assert!(orchestrator.is_task_completed(&TaskId::new("t-2")));
    assert_eq!(orchestrator.worker_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn worker_states_are_sorted_and_stable() {
    let (_harness, mut orchestrator) = harness_with(OrchestratorConfig {
        max_workers: 3,
        ..OrchestratorConfig::default()
    });
    for i in 1..=3 {
        orchestrator.queue_task(task(&format!("t-{}", i))).await;
    }
    orchestrator.tick().await;

    let infos = orchestrator.worker_states();
    assert_eq!(infos.len(), 3);
    let ids: Vec<&str> = infos.iter().map(|info| info.id.as_str()).collect();
    let mut sorted = ids.clone();
    sorted.sort_unstable();
    assert_eq!(ids, sorted);
}
