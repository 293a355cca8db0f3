// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use hive_adapters::MuxCall;
use hive_core::{TaskId, WorkerState};

#[tokio::test(start_paused = true)]
async fn approval_dialog_with_auto_approve_sends_enter() {
    let (harness, mut orchestrator) = harness_with(OrchestratorConfig {
        auto_approve: true,
        ..OrchestratorConfig::default()
    });
    orchestrator.queue_task(task("t-1")).await;
    orchestrator.tick().await;
    let target = harness.sole_target();

    harness
        .mux
        .set_pane(&target, "Do you want to proceed?\n❯ 1. Yes\n  2. No");
    harness.mux.grow_pipe(&target, 10);
    advance_and_tick(&harness, &mut orchestrator, 6_000).await;

    assert_eq!(
        orchestrator.worker_states()[0].state,
        WorkerState::WaitingApproval
    );
    let approved = harness.mux.calls().iter().any(|call| {
        matches!(call, MuxCall::SendKeys { target: t, keys } if *t == target && keys == &vec!["Enter".to_string()])
    });
    assert!(approved, "auto-approve sends Enter");
}

#[tokio::test(start_paused = true)]
async fn approval_policy_denial_fails_the_task() {
    let mut config = OrchestratorConfig::default();
    config.approval_policy = Some(hive_core::ApprovalPolicy {
        denied_commands: vec!["git push --force".into()],
        ..Default::default()
    });
    let (harness, mut orchestrator) = harness_with(config);
    orchestrator.queue_task(task("t-1")).await;
    orchestrator.tick().await;
    let target = harness.sole_target();

    harness.mux.set_pane(
        &target,
        "Bash command: git push --force origin main\nDo you want to proceed?",
    );
    harness.mux.grow_pipe(&target, 10);
    advance_and_tick(&harness, &mut orchestrator, 6_000).await;

    let id = TaskId::new("t-1");
    assert!(orchestrator.is_task_failed(&id));
    let reason = orchestrator.failure_reason(&id).unwrap();
    assert!(reason.contains("approval denied by policy"));
    assert!(reason.contains("git push --force"));
}

#[tokio::test(start_paused = true)]
async fn escalation_done_marks_complete_and_records_affinity() {
    let (harness, mut orchestrator) = harness();
    orchestrator.queue_task(task("t-1")).await;
    orchestrator.tick().await;
    let target = harness.sole_target();

    harness.mux.set_pane(&target, "Should I write the tests too?");
    harness.mux.grow_pipe(&target, 10);
    harness.escalation.push_response("DONE");
    advance_and_tick(&harness, &mut orchestrator, 6_000).await;

    assert!(orchestrator.is_task_completed(&TaskId::new("t-1")));
    assert_eq!(harness.events_of("task:completed").len(), 1);
    assert_eq!(orchestrator.worker_states()[0].tasks_completed, 1);
}

#[tokio::test(start_paused = true)]
async fn escalation_failed_reply_fails_with_state_reason() {
    let (harness, mut orchestrator) = harness();
    orchestrator.queue_task(task("t-1")).await;
    orchestrator.tick().await;
    let target = harness.sole_target();

    harness.mux.set_pane(&target, "API Error: internal failure");
    harness.mux.grow_pipe(&target, 10);
    harness.escalation.push_response("FAILED");
    advance_and_tick(&harness, &mut orchestrator, 6_000).await;

    let id = TaskId::new("t-1");
    assert!(orchestrator.is_task_failed(&id));
    assert_eq!(orchestrator.failure_reason(&id), Some("error"));
}

#[tokio::test(start_paused = true)]
async fn escalation_action_is_dropped_when_worker_dies_mid_flight() {
    let (harness, mut orchestrator) = harness();
    orchestrator.queue_task(task("t-1")).await;
    orchestrator.tick().await;
    let target = harness.sole_target();

    // The window dies before the LLM answers; the fake resolves instantly
    // but liveness is checked after resolution either way.
    harness.mux.set_pane(&target, "Should I continue?");
    harness.mux.grow_pipe(&target, 10);
    harness.escalation.push_response("Type this into the TUI");
    harness.mux.set_alive(&target, false);
    advance_and_tick(&harness, &mut orchestrator, 6_000).await;

    // The literal reply was never typed
    let sent = harness.mux.sent_text(&target);
    assert_eq!(sent, vec!["prompt for t-1"]);

    // The reap pass requeued the task
    assert_eq!(orchestrator.pending_count(), 1);
    assert_eq!(harness.events_of("worker:died").len(), 1);
}

#[tokio::test(start_paused = true)]
async fn completed_and_failed_partition_the_queued_ids() {
    let (harness, mut orchestrator) = harness_with(OrchestratorConfig {
        idle_settling_ms: 1_000,
        max_workers: 1,
        ..OrchestratorConfig::default()
    });
    orchestrator.queue_task(task("good")).await;
    orchestrator
        .queue_task(Task::new("bad", "aider", "prompt", 0))
        .await;

    for _ in 0..20 {
        advance_and_tick(&harness, &mut orchestrator, 3_000).await;
    }

    let good = TaskId::new("good");
    let bad = TaskId::new("bad");
    assert!(orchestrator.is_task_completed(&good));
    assert!(orchestrator.is_task_failed(&bad));
    assert_eq!(orchestrator.pending_count(), 0);

    // Disjoint: a task is never in both sets
    assert!(!orchestrator.is_task_failed(&good));
    assert!(!orchestrator.is_task_completed(&bad));
}

#[tokio::test(start_paused = true)]
async fn panicking_event_handler_does_not_break_the_loop() {
    let (harness, mut orchestrator) = harness_with(OrchestratorConfig {
        idle_settling_ms: 1_000,
        ..OrchestratorConfig::default()
    });
    orchestrator.set_event_handler(Box::new(|_| panic!("observer bug")));

    orchestrator.queue_task(task("t-1")).await;
    for _ in 0..5 {
        advance_and_tick(&harness, &mut orchestrator, 3_000).await;
    }

    // Task still completes despite the handler panicking on every event
    assert!(orchestrator.is_task_completed(&TaskId::new("t-1")));
}
