// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Orchestrator tests, driven tick by tick through the fake adapters.

mod actions;
mod dispatch;
mod lifecycle;
mod monitor;

use super::*;
use hive_adapters::multiplexer::FakeMultiplexer;
use hive_adapters::store::MemoryTaskStore;
use hive_adapters::worktree::FakeWorktrees;
use hive_adapters::FakeEscalation;
use hive_core::FakeClock;
use parking_lot::Mutex;
use std::time::Duration as StdDuration;

pub(crate) const CLAUDE_READY: &str = "> \n? for shortcuts";
pub(crate) const CLAUDE_WORKING: &str = "✻ Churning… (esc to interrupt)";

pub(crate) type TestOrchestrator =
    Orchestrator<FakeMultiplexer, FakeEscalation, FakeWorktrees, MemoryTaskStore, FakeClock>;

pub(crate) struct Harness {
    pub mux: FakeMultiplexer,
    pub escalation: FakeEscalation,
    pub worktrees: FakeWorktrees,
    pub store: MemoryTaskStore,
    pub clock: FakeClock,
    pub events: Arc<Mutex<Vec<OrchestratorEvent>>>,
    pub dir: tempfile::TempDir,
}

impl Harness {
    /// Event names in emission order.
    pub fn event_names(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .map(|event| {
                event
                    .log_summary()
                    .split_whitespace()
                    .next()
                    .unwrap_or_default()
                    .to_string()
            })
            .collect()
    }

    pub fn events_of(&self, prefix: &str) -> Vec<OrchestratorEvent> {
        self.events
            .lock()
            .iter()
            .filter(|event| event.log_summary().starts_with(prefix))
            .cloned()
            .collect()
    }

    /// The single live worker's pane target (panics unless exactly one).
    pub fn sole_target(&self) -> String {
        let targets = self.mux.window_targets();
        assert_eq!(targets.len(), 1, "expected one worker, got {:?}", targets);
        targets[0].clone()
    }
}

pub(crate) fn harness_with(config: OrchestratorConfig) -> (Harness, TestOrchestrator) {
    let mux = FakeMultiplexer::new();
    mux.set_default_pane(CLAUDE_READY);
    let escalation = FakeEscalation::new();
    let worktrees = FakeWorktrees::new();
    let store = MemoryTaskStore::new();
    let clock = FakeClock::new();
    let dir = tempfile::tempdir().unwrap();

    let mut config = config;
    config.repo_root = Some(dir.path().to_path_buf());

    let mut orchestrator = Orchestrator::new(
        OrchestratorDeps {
            mux: mux.clone(),
            escalation: escalation.clone(),
            worktrees: worktrees.clone(),
            store: store.clone(),
        },
        clock.clone(),
        config,
    );
    orchestrator.set_state_path(dir.path().join("orchestration-state.json"));

    let events: Arc<Mutex<Vec<OrchestratorEvent>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    orchestrator.set_event_handler(Box::new(move |event| {
        sink.lock().push(event.clone());
    }));

    (
        Harness {
            mux,
            escalation,
            worktrees,
            store,
            clock,
            events,
            dir,
        },
        orchestrator,
    )
}

pub(crate) fn harness() -> (Harness, TestOrchestrator) {
    harness_with(OrchestratorConfig::default())
}

pub(crate) fn task(id: &str) -> Task {
    Task::new(id, "claude", format!("prompt for {}", id), 0)
}

/// Advance fake and tokio time together, then tick.
pub(crate) async fn advance_and_tick(
    harness: &Harness,
    orchestrator: &mut TestOrchestrator,
    ms: u64,
) {
    harness.clock.advance(StdDuration::from_millis(ms));
    tokio::time::advance(StdDuration::from_millis(ms)).await;
    orchestrator.tick().await;
}
