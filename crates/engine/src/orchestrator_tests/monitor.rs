// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use hive_core::{TaskId, WorkerState};

#[tokio::test(start_paused = true)]
async fn quiet_worker_is_debounced_between_checks() {
    let (harness, mut orchestrator) = harness();
    orchestrator.queue_task(task("t-1")).await;
    orchestrator.tick().await;
    let target = harness.sole_target();
    harness.mux.set_pane(&target, CLAUDE_WORKING);
    harness.mux.grow_pipe(&target, 10);
    advance_and_tick(&harness, &mut orchestrator, 6_000).await;

    let captures_before = harness
        .mux
        .calls()
        .iter()
        .filter(|c| matches!(c, hive_adapters::MuxCall::CapturePane { .. }))
        .count();

    // Two quick ticks with no pipe growth: no further pane captures
    advance_and_tick(&harness, &mut orchestrator, 1_000).await;
    advance_and_tick(&harness, &mut orchestrator, 1_000).await;
    let captures_after = harness
        .mux
        .calls()
        .iter()
        .filter(|c| matches!(c, hive_adapters::MuxCall::CapturePane { .. }))
        .count();
    assert_eq!(captures_before, captures_after);

    // Fresh pipe output forces an immediate re-check
    harness.mux.grow_pipe(&target, 10);
    advance_and_tick(&harness, &mut orchestrator, 100).await;
    let captures_final = harness
        .mux
        .calls()
        .iter()
        .filter(|c| matches!(c, hive_adapters::MuxCall::CapturePane { .. }))
        .count();
    assert!(captures_final > captures_after);
}

#[tokio::test(start_paused = true)]
async fn state_changes_are_emitted_and_mirrored() {
    let (harness, mut orchestrator) = harness();
    orchestrator.queue_task(task("t-1")).await;
    orchestrator.tick().await;
    let target = harness.sole_target();

    harness.mux.set_pane(&target, CLAUDE_WORKING);
    harness.mux.grow_pipe(&target, 10);
    advance_and_tick(&harness, &mut orchestrator, 6_000).await;

    let changes = harness.events_of("worker:state_changed");
    assert!(!changes.is_empty());
    let worker = &orchestrator.worker_states()[0];
    assert_eq!(worker.state, WorkerState::Working);
    assert_eq!(
        worker
            .assignment
            .as_ref()
            .and_then(|a| a.task.worker_state),
        Some(WorkerState::Working),
        "detected state mirrors onto the task"
    );
}

#[tokio::test(start_paused = true)]
async fn task_timeout_fails_before_other_work() {
    let (harness, mut orchestrator) = harness_with(OrchestratorConfig {
        task_timeout_ms: 10_000,
        ..OrchestratorConfig::default()
    });
    orchestrator.queue_task(task("t-1")).await;
    orchestrator.tick().await;
    let target = harness.sole_target();
    harness.mux.set_pane(&target, CLAUDE_WORKING);

    advance_and_tick(&harness, &mut orchestrator, 11_000).await;

    let id = TaskId::new("t-1");
    assert!(orchestrator.is_task_failed(&id));
    let reason = orchestrator.failure_reason(&id).unwrap();
    assert!(reason.contains("timed out"), "reason: {}", reason);

    // Worker survives and returns to idle for the next task
    assert_eq!(orchestrator.worker_count(), 1);
    assert_eq!(orchestrator.worker_states()[0].state, WorkerState::Idle);
}

#[tokio::test(start_paused = true)]
async fn stuck_worker_escalates_and_llm_restart_is_executed() {
    let (harness, mut orchestrator) = harness();
    orchestrator.queue_task(task("t-1")).await;
    orchestrator.tick().await;
    let target = harness.sole_target();

    // Working output arrives once...
    harness.mux.set_pane(&target, CLAUDE_WORKING);
    harness.mux.grow_pipe(&target, 10);
    advance_and_tick(&harness, &mut orchestrator, 6_000).await;
    assert_eq!(orchestrator.worker_states()[0].state, WorkerState::Working);

    // ...then nothing changes past the stuck timeout
    harness.escalation.push_response("RESTART");
    advance_and_tick(&harness, &mut orchestrator, 120_001).await;

    assert_eq!(harness.events_of("escalation:resolved").len(), 1);
    assert_eq!(harness.events_of("worker:restarted").len(), 1);
    assert_eq!(harness.escalation.invocations()[0].0, "claude");
    let prompt = &harness.escalation.prompts()[0];
    assert!(prompt.contains("stuck"), "prompt: {}", prompt);
}

#[tokio::test(start_paused = true)]
async fn escalation_literal_text_is_typed_into_the_tui() {
    let (harness, mut orchestrator) = harness();
    orchestrator.queue_task(task("t-1")).await;
    orchestrator.tick().await;
    let target = harness.sole_target();

    harness.mux.set_pane(&target, "Which database should I use?");
    harness.mux.grow_pipe(&target, 10);
    harness
        .escalation
        .push_response("Use sqlite, it's already a dependency.");
    advance_and_tick(&harness, &mut orchestrator, 6_000).await;

    let sent = harness.mux.sent_text(&target);
    assert!(
        sent.contains(&"Use sqlite, it's already a dependency.".to_string()),
        "sent: {:?}",
        sent
    );
}

#[tokio::test(start_paused = true)]
async fn escalation_failure_degrades_to_wait() {
    let (harness, mut orchestrator) = harness();
    orchestrator.queue_task(task("t-1")).await;
    orchestrator.tick().await;
    let target = harness.sole_target();

    harness.mux.set_pane(&target, "API Error: upstream connect failed");
    harness.mux.grow_pipe(&target, 10);
    harness.escalation.push_failure("escalation tool crashed");
    advance_and_tick(&harness, &mut orchestrator, 6_000).await;

    let escalations = harness.events_of("escalation:resolved");
    assert_eq!(escalations.len(), 1);
    match &escalations[0] {
        OrchestratorEvent::LlmEscalation { action, .. } => {
            assert_eq!(action, &hive_core::OrchestratorAction::Wait { ms: 30_000 });
        }
        other => panic!("unexpected event {:?}", other),
    }

    // The postponed worker is not re-captured on the next quick tick
    let captures_before = harness
        .mux
        .calls()
        .iter()
        .filter(|c| matches!(c, hive_adapters::MuxCall::CapturePane { .. }))
        .count();
    advance_and_tick(&harness, &mut orchestrator, 1_000).await;
    let captures_after = harness
        .mux
        .calls()
        .iter()
        .filter(|c| matches!(c, hive_adapters::MuxCall::CapturePane { .. }))
        .count();
    assert_eq!(captures_before, captures_after);
}

#[tokio::test(start_paused = true)]
async fn dead_worker_requeues_task_and_is_removed() {
    let (harness, mut orchestrator) = harness();
    orchestrator.queue_task(task("t-1")).await;
    orchestrator.tick().await;
    let target = harness.sole_target();

    harness.mux.set_alive(&target, false);
    advance_and_tick(&harness, &mut orchestrator, 1_000).await;

    assert_eq!(orchestrator.worker_count(), 0);
    assert_eq!(orchestrator.pending_count(), 1, "assignment requeued");
    let died = harness.events_of("worker:died");
    assert_eq!(died.len(), 1);
    match &died[0] {
        OrchestratorEvent::WorkerDied { requeued_task, .. } => {
            assert_eq!(
                requeued_task.as_ref().map(|t| t.as_str()),
                Some("t-1")
            );
        }
        other => panic!("unexpected event {:?}", other),
    }

    // Next tick recreates a worker for the requeued task
    advance_and_tick(&harness, &mut orchestrator, 1_000).await;
    assert_eq!(orchestrator.worker_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn idle_settling_completes_exactly_once() {
    let (harness, mut orchestrator) = harness_with(OrchestratorConfig {
        idle_settling_ms: 5_000,
        ..OrchestratorConfig::default()
    });
    orchestrator.queue_task(task("t-1")).await;
    orchestrator.tick().await;
    let target = harness.sole_target();

    harness.mux.set_pane(&target, CLAUDE_WORKING);
    harness.mux.grow_pipe(&target, 10);
    advance_and_tick(&harness, &mut orchestrator, 6_000).await;

    // Idle appears; examined again before settling -> still assigned
    harness.mux.set_pane(&target, CLAUDE_READY);
    harness.mux.grow_pipe(&target, 10);
    advance_and_tick(&harness, &mut orchestrator, 1_000).await;
    assert!(!orchestrator.is_task_completed(&TaskId::new("t-1")));
    assert!(orchestrator.worker_states()[0].assignment.is_some());

    // Examined past the settling window -> completed, exactly once
    advance_and_tick(&harness, &mut orchestrator, 6_000).await;
    assert!(orchestrator.is_task_completed(&TaskId::new("t-1")));
    assert_eq!(orchestrator.worker_states()[0].tasks_completed, 1);
    assert_eq!(harness.events_of("task:completed").len(), 1);

    // Later ticks never double-complete
    advance_and_tick(&harness, &mut orchestrator, 6_000).await;
    assert_eq!(harness.events_of("task:completed").len(), 1);
    assert_eq!(orchestrator.worker_states()[0].tasks_completed, 1);
}
