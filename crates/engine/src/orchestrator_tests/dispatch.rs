// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use hive_core::{TaskId, TaskStatus, WorkerState};

#[tokio::test(start_paused = true)]
async fn unsupported_tool_fails_in_one_tick() {
    let (harness, mut orchestrator) = harness();
    orchestrator
        .queue_task(Task::new("t-1", "aider", "prompt", 0))
        .await;

    orchestrator.tick().await;

    let id = TaskId::new("t-1");
    assert!(orchestrator.is_task_failed(&id));
    assert_eq!(
        orchestrator.failure_reason(&id),
        Some("Unsupported tool: aider")
    );
    assert_eq!(orchestrator.pending_count(), 0);
    assert_eq!(orchestrator.worker_count(), 0);

    let failed = harness.events_of("task:failed");
    assert_eq!(failed.len(), 1);
    assert_eq!(
        harness.store.latest("t-1").unwrap().status,
        TaskStatus::Failed
    );
}

#[tokio::test(start_paused = true)]
async fn dispatch_creates_worker_and_assigns() {
    let (harness, mut orchestrator) = harness();
    orchestrator.queue_task(task("t-1")).await;

    orchestrator.tick().await;

    assert_eq!(orchestrator.worker_count(), 1);
    assert_eq!(orchestrator.pending_count(), 0);
    let workers = orchestrator.worker_states();
    assert_eq!(workers[0].state, WorkerState::Working);
    assert!(workers[0].id.as_str().starts_with("claude-"));

    // worker:created precedes task:assigned
    let names = harness.event_names();
    let created = names.iter().position(|n| n == "worker:created").unwrap();
    let assigned = names.iter().position(|n| n == "task:assigned").unwrap();
    assert!(created < assigned);

    // The prompt was typed into the new window
    let target = harness.sole_target();
    assert_eq!(harness.mux.sent_text(&target), vec!["prompt for t-1"]);

    // Started task persisted as running
    assert_eq!(
        harness.store.latest("t-1").unwrap().status,
        TaskStatus::Running
    );
}

#[tokio::test(start_paused = true)]
async fn pool_is_bounded_by_max_workers() {
    let (_harness, mut orchestrator) = harness_with(OrchestratorConfig {
        max_workers: 2,
        ..OrchestratorConfig::default()
    });
    for i in 1..=5 {
        orchestrator.queue_task(task(&format!("t-{}", i))).await;
    }

    orchestrator.tick().await;

    assert_eq!(orchestrator.worker_count(), 2);
    assert_eq!(orchestrator.pending_count(), 3, "excess tasks stay pending");
}

#[tokio::test(start_paused = true)]
async fn waiting_for_capacity_does_not_burn_retries() {
    let (harness, mut orchestrator) = harness_with(OrchestratorConfig {
        max_workers: 1,
        ..OrchestratorConfig::default()
    });
    orchestrator.queue_task(task("t-1")).await;
    orchestrator.tick().await;

    // Keep the sole worker visibly busy while t-2 waits for capacity
    let target = harness.sole_target();
    harness.mux.set_pane(&target, CLAUDE_WORKING);
    orchestrator.queue_task(task("t-2")).await;
    for _ in 0..10 {
        harness.mux.grow_pipe(&target, 10);
        advance_and_tick(&harness, &mut orchestrator, 1_000).await;
    }

    let id = TaskId::new("t-2");
    assert!(!orchestrator.is_task_failed(&id), "t-2 must stay pending");
    assert_eq!(orchestrator.pending_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn worker_creation_failures_retry_then_fail_terminally() {
    let (harness, mut orchestrator) = harness();
    orchestrator.queue_task(task("t-1")).await;

    for attempt in 1..=5 {
        harness.mux.fail_next_create(format!("boom {}", attempt));
        orchestrator.tick().await;
    }

    let id = TaskId::new("t-1");
    assert!(orchestrator.is_task_failed(&id));
    let reason = orchestrator.failure_reason(&id).unwrap();
    assert!(
        reason.contains("worker creation failed after 5 attempts"),
        "reason: {}",
        reason
    );
}

#[tokio::test(start_paused = true)]
async fn idle_worker_is_reused_for_next_task() {
    let (harness, mut orchestrator) = harness_with(OrchestratorConfig {
        idle_settling_ms: 1_000,
        ..OrchestratorConfig::default()
    });
    orchestrator.queue_task(task("t-1")).await;
    orchestrator.tick().await;
    let target = harness.sole_target();

    // Finish t-1: idle pane, settle, complete
    harness.mux.set_pane(&target, CLAUDE_WORKING);
    harness.mux.grow_pipe(&target, 10);
    advance_and_tick(&harness, &mut orchestrator, 6_000).await;
    harness.mux.set_pane(&target, CLAUDE_READY);
    advance_and_tick(&harness, &mut orchestrator, 6_000).await;
    advance_and_tick(&harness, &mut orchestrator, 6_000).await;
    assert!(orchestrator.is_task_completed(&TaskId::new("t-1")));

    // t-2 reuses the same worker instead of creating a second window
    orchestrator.queue_task(task("t-2")).await;
    orchestrator.tick().await;
    assert_eq!(orchestrator.worker_count(), 1);
    assert_eq!(harness.mux.window_targets().len(), 1);
    let sent = harness.mux.sent_text(&target);
    assert!(sent.contains(&"prompt for t-2".to_string()));
}

#[tokio::test(start_paused = true)]
async fn affinity_routes_dependent_task_to_same_worker() {
    let (harness, mut orchestrator) = harness_with(OrchestratorConfig {
        idle_settling_ms: 1_000,
        max_workers: 3,
        ..OrchestratorConfig::default()
    });
    orchestrator.queue_task(task("t-1")).await;
    orchestrator.tick().await;
    let target = harness.sole_target();

    harness.mux.set_pane(&target, CLAUDE_WORKING);
    harness.mux.grow_pipe(&target, 10);
    advance_and_tick(&harness, &mut orchestrator, 6_000).await;
    harness.mux.set_pane(&target, CLAUDE_READY);
    advance_and_tick(&harness, &mut orchestrator, 6_000).await;
    advance_and_tick(&harness, &mut orchestrator, 6_000).await;
    assert!(orchestrator.is_task_completed(&TaskId::new("t-1")));
    let affinity_worker = orchestrator.worker_states()[0].id.clone();

    // A dependent task lands on the worker that completed its dependency
    let dependent = task("t-2").with_depends_on(vec![TaskId::new("t-1")]);
    orchestrator.queue_task(dependent).await;
    orchestrator.tick().await;

    let workers = orchestrator.worker_states();
    assert_eq!(workers.len(), 1);
    assert_eq!(workers[0].id, affinity_worker);
    assert_eq!(
        workers[0]
            .assignment
            .as_ref()
            .map(|a| a.task.id.as_str()),
        Some("t-2")
    );
}

#[tokio::test(start_paused = true)]
async fn provider_cooldown_skips_dispatch_for_that_tool_only() {
    let (harness, mut orchestrator) = harness_with(OrchestratorConfig {
        max_workers: 4,
        ..OrchestratorConfig::default()
    });

    // First worker hits a rate limit
    orchestrator.queue_task(task("t-1")).await;
    orchestrator.tick().await;
    let target = harness.sole_target();
    harness.mux.set_pane(&target, "You've been rate limited, too many requests");
    harness.mux.grow_pipe(&target, 10);
    advance_and_tick(&harness, &mut orchestrator, 6_000).await;
    assert_eq!(
        orchestrator.worker_states()[0].state,
        hive_core::WorkerState::RateLimited
    );

    // A fresh claude task cannot dispatch during the cooldown
    orchestrator.queue_task(task("t-2")).await;
    advance_and_tick(&harness, &mut orchestrator, 1_000).await;
    assert_eq!(orchestrator.pending_count(), 1);
    assert_eq!(orchestrator.worker_count(), 1);

    // A codex task is unaffected by claude's cooldown
    let codex_ready = "⏎ send   Ctrl+J newline";
    harness.mux.set_default_pane(codex_ready);
    orchestrator
        .queue_task(Task::new("t-3", "codex", "other tool", 0))
        .await;
    advance_and_tick(&harness, &mut orchestrator, 1_000).await;
    assert_eq!(orchestrator.worker_count(), 2);
    assert!(!orchestrator.is_task_failed(&TaskId::new("t-3")));

    // After the cooldown elapses the claude task dispatches
    harness.mux.set_default_pane(CLAUDE_READY);
    advance_and_tick(&harness, &mut orchestrator, 61_000).await;
    assert_eq!(orchestrator.pending_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn worktrees_attach_when_enabled_and_failures_are_nonfatal() {
    let (harness, mut orchestrator) = harness_with(OrchestratorConfig {
        use_worktrees: true,
        ..OrchestratorConfig::default()
    });

    orchestrator.queue_task(task("t-1")).await;
    orchestrator.tick().await;
    assert_eq!(harness.worktrees.created(), vec!["t-1"]);
    let running = harness.store.latest("t-1").unwrap();
    assert!(running.worktree_path.is_some());
    assert_eq!(running.worktree_branch.as_deref(), Some("hive/t-1"));

    // Worktree failure still dispatches the task
    harness.worktrees.set_failing(true);
    orchestrator.queue_task(task("t-2")).await;
    orchestrator.tick().await;
    let running = harness.store.latest("t-2").unwrap();
    assert_eq!(running.status, TaskStatus::Running);
    assert!(running.worktree_path.is_none());
}

#[tokio::test(start_paused = true)]
async fn recycled_out_workers_are_not_reused() {
    let (harness, mut orchestrator) = harness_with(OrchestratorConfig {
        idle_settling_ms: 1_000,
        max_tasks_per_worker: 1,
        max_workers: 2,
        ..OrchestratorConfig::default()
    });
    orchestrator.queue_task(task("t-1")).await;
    orchestrator.tick().await;
    let target = harness.sole_target();

    harness.mux.set_pane(&target, CLAUDE_WORKING);
    harness.mux.grow_pipe(&target, 10);
    advance_and_tick(&harness, &mut orchestrator, 6_000).await;
    harness.mux.set_pane(&target, CLAUDE_READY);
    advance_and_tick(&harness, &mut orchestrator, 6_000).await;
    advance_and_tick(&harness, &mut orchestrator, 6_000).await;

    // Completion at the per-worker cap recycles (restarts) the worker,
    // which resets its counter; the restart event proves the recycle ran.
    assert!(orchestrator.is_task_completed(&TaskId::new("t-1")));
    assert!(!harness.events_of("worker:restarted").is_empty());
}
