//! Spec: rate-limit ripple.
//!
//! One worker hitting a rate limit waits locally and installs a provider
//! cooldown; pending tasks for the same tool skip dispatch until it elapses
//! while other tools keep flowing.

use crate::prelude::*;
use hive_core::{OrchestratorConfig, Task, TaskId, WorkerState};

#[tokio::test(start_paused = true)]
async fn rate_limit_ripples_to_same_tool_only() {
    let (harness, mut orchestrator) = harness_with(OrchestratorConfig {
        max_workers: 4,
        ..OrchestratorConfig::default()
    });

    orchestrator.queue_task(claude_task("first")).await;
    orchestrator.tick().await;
    let target = harness.sole_target();

    // The pane shows the provider pushing back
    harness.mux.set_pane(&target, "Error 429: rate limit exceeded");
    harness.mux.grow_pipe(&target, 64);
    harness.advance_and_tick(&mut orchestrator, 6_000).await;

    assert_eq!(
        orchestrator.worker_states()[0].state,
        WorkerState::RateLimited
    );

    // Same-tool task parks in the queue during the cooldown
    orchestrator.queue_task(claude_task("second")).await;
    harness.advance_and_tick(&mut orchestrator, 1_000).await;
    assert_eq!(orchestrator.pending_count(), 1);
    assert_eq!(orchestrator.worker_count(), 1);

    // Another tool dispatches immediately
    harness.mux.set_default_pane("⏎ send   Ctrl+J newline");
    orchestrator
        .queue_task(Task::new("other", "codex", "unaffected", 0))
        .await;
    harness.advance_and_tick(&mut orchestrator, 1_000).await;
    assert_eq!(orchestrator.worker_count(), 2);
    assert!(!orchestrator.is_task_failed(&TaskId::new("other")));

    // Once the 60s cooldown elapses, the parked task dispatches
    harness.mux.set_default_pane(CLAUDE_READY);
    harness.advance_and_tick(&mut orchestrator, 61_000).await;
    assert_eq!(orchestrator.pending_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn rate_limited_worker_is_postponed_not_hammered() {
    let (harness, mut orchestrator) = harness();
    orchestrator.queue_task(claude_task("first")).await;
    orchestrator.tick().await;
    let target = harness.sole_target();

    harness.mux.set_pane(&target, "rate limit exceeded, slow down");
    harness.mux.grow_pipe(&target, 64);
    harness.advance_and_tick(&mut orchestrator, 6_000).await;

    let captures = |harness: &SpecHarness| {
        harness
            .mux
            .calls()
            .iter()
            .filter(|c| matches!(c, hive_adapters::MuxCall::CapturePane { .. }))
            .count()
    };
    let before = captures(&harness);

    // Quick follow-up ticks within the 60s wait: the worker is left alone
    harness.advance_and_tick(&mut orchestrator, 5_000).await;
    harness.advance_and_tick(&mut orchestrator, 5_000).await;
    assert_eq!(captures(&harness), before);
}
