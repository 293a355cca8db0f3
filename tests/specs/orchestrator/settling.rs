//! Spec: idle settling.
//!
//! An assigned worker that turns idle is not completed until the settling
//! dwell elapses; completion then happens exactly once and records worker
//! affinity for dependent tasks.

use crate::prelude::*;
use hive_core::{OrchestratorConfig, TaskId};

#[tokio::test(start_paused = true)]
async fn settling_window_defers_completion() {
    let (harness, mut orchestrator) = harness_with(OrchestratorConfig {
        idle_settling_ms: 5_000,
        ..OrchestratorConfig::default()
    });
    orchestrator.queue_task(claude_task("t-1")).await;
    orchestrator.tick().await;
    let target = harness.sole_target();

    // Work happens, then the idle prompt returns
    harness.mux.set_pane(&target, CLAUDE_WORKING);
    harness.mux.grow_pipe(&target, 64);
    harness.advance_and_tick(&mut orchestrator, 6_000).await;
    harness.mux.set_pane(&target, CLAUDE_READY);
    harness.mux.grow_pipe(&target, 64);
    harness.advance_and_tick(&mut orchestrator, 1_000).await;

    // Examined before the dwell elapses: still assigned, nothing completed
    assert!(!orchestrator.is_task_completed(&TaskId::new("t-1")));
    assert!(orchestrator.worker_states()[0].assignment.is_some());

    // Examined after the dwell: completed exactly once
    harness.advance_and_tick(&mut orchestrator, 6_000).await;
    assert!(orchestrator.is_task_completed(&TaskId::new("t-1")));
    assert_eq!(harness.events_of("task:completed").len(), 1);
    assert_eq!(orchestrator.worker_states()[0].tasks_completed, 1);

    harness.advance_and_tick(&mut orchestrator, 6_000).await;
    assert_eq!(harness.events_of("task:completed").len(), 1, "no double completion");
}

#[tokio::test(start_paused = true)]
async fn completion_records_affinity_for_dependents() {
    let (harness, mut orchestrator) = harness_with(OrchestratorConfig {
        idle_settling_ms: 1_000,
        max_workers: 3,
        ..OrchestratorConfig::default()
    });
    orchestrator.queue_task(claude_task("base")).await;
    orchestrator.tick().await;
    let target = harness.sole_target();

    harness.mux.set_pane(&target, CLAUDE_WORKING);
    harness.mux.grow_pipe(&target, 64);
    harness.advance_and_tick(&mut orchestrator, 6_000).await;
    harness.mux.set_pane(&target, CLAUDE_READY);
    harness.mux.grow_pipe(&target, 64);
    harness.advance_and_tick(&mut orchestrator, 6_000).await;
    harness.advance_and_tick(&mut orchestrator, 6_000).await;
    assert!(orchestrator.is_task_completed(&TaskId::new("base")));
    let base_worker = orchestrator.worker_states()[0].id.clone();

    // The dependent task goes to the worker that completed `base`, not a
    // fresh window
    let dependent = claude_task("child").with_depends_on(vec![TaskId::new("base")]);
    orchestrator.queue_task(dependent).await;
    orchestrator.tick().await;

    let workers = orchestrator.worker_states();
    assert_eq!(workers.len(), 1);
    assert_eq!(workers[0].id, base_worker);
    assert_eq!(
        workers[0].assignment.as_ref().map(|a| a.task.id.as_str()),
        Some("child")
    );
}

#[tokio::test(start_paused = true)]
async fn transient_idle_between_tool_calls_does_not_complete() {
    let (harness, mut orchestrator) = harness_with(OrchestratorConfig {
        idle_settling_ms: 5_000,
        ..OrchestratorConfig::default()
    });
    orchestrator.queue_task(claude_task("t-1")).await;
    orchestrator.tick().await;
    let target = harness.sole_target();

    // Idle blip, then the agent resumes before the dwell elapses
    harness.mux.set_pane(&target, CLAUDE_READY);
    harness.mux.grow_pipe(&target, 64);
    harness.advance_and_tick(&mut orchestrator, 1_000).await;
    harness.mux.set_pane(&target, CLAUDE_WORKING);
    harness.mux.grow_pipe(&target, 64);
    harness.advance_and_tick(&mut orchestrator, 1_000).await;

    // Back to idle: the dwell restarts from zero
    harness.mux.set_pane(&target, CLAUDE_READY);
    harness.mux.grow_pipe(&target, 64);
    harness.advance_and_tick(&mut orchestrator, 1_000).await;
    harness.advance_and_tick(&mut orchestrator, 2_000).await;
    assert!(
        !orchestrator.is_task_completed(&TaskId::new("t-1")),
        "dwell must restart after the blip"
    );

    harness.advance_and_tick(&mut orchestrator, 6_000).await;
    assert!(orchestrator.is_task_completed(&TaskId::new("t-1")));
}
