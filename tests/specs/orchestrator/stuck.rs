//! Spec: stuck recovery.
//!
//! A worker whose pipe stops growing past the stuck timeout is refined to
//! `stuck`; Tier 1 escalates, the LLM answers RESTART, and the worker is
//! restarted with its prompt re-sent.

use crate::prelude::*;
use hive_core::WorkerState;

#[tokio::test(start_paused = true)]
async fn stuck_worker_is_restarted_on_llm_advice() {
    let (harness, mut orchestrator) = harness();
    orchestrator.queue_task(claude_task("wedge")).await;
    orchestrator.tick().await;
    let target = harness.sole_target();

    // Output arrives once, then the agent goes quiet while claiming to work
    harness.mux.set_pane(&target, CLAUDE_WORKING);
    harness.mux.grow_pipe(&target, 64);
    harness.advance_and_tick(&mut orchestrator, 6_000).await;
    assert_eq!(orchestrator.worker_states()[0].state, WorkerState::Working);

    harness.escalation.push_response("RESTART");
    harness.advance_and_tick(&mut orchestrator, 120_001).await;

    // stuck -> escalation -> restart
    let changes = harness.events_of("worker:state_changed");
    assert!(changes
        .iter()
        .any(|event| event.log_summary().ends_with("working -> stuck")));
    assert_eq!(harness.events_of("escalation:resolved").len(), 1);
    assert_eq!(harness.events_of("worker:restarted").len(), 1);

    // The escalation prompt described the quiet period and offered RESTART
    let prompt = &harness.escalation.prompts()[0];
    assert!(prompt.contains("no output change"), "prompt: {}", prompt);
    assert!(prompt.contains("RESTART"));

    // The restarted worker got the task prompt again
    let sent = harness.mux.sent_text(&target);
    assert_eq!(
        sent,
        vec!["prompt for wedge".to_string(), "prompt for wedge".to_string()]
    );
}

#[tokio::test(start_paused = true)]
async fn continued_pipe_growth_never_goes_stuck() {
    let (harness, mut orchestrator) = harness();
    orchestrator.queue_task(claude_task("busy")).await;
    orchestrator.tick().await;
    let target = harness.sole_target();
    harness.mux.set_pane(&target, CLAUDE_WORKING);

    // Output keeps flowing in 60s strides, each under the stuck timeout
    for _ in 0..4 {
        harness.mux.grow_pipe(&target, 64);
        harness.advance_and_tick(&mut orchestrator, 60_000).await;
        assert_eq!(orchestrator.worker_states()[0].state, WorkerState::Working);
    }
    assert!(harness.events_of("escalation:resolved").is_empty());
}
