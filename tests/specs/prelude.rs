//! Shared harness for behavioral specs.

use hive_adapters::multiplexer::FakeMultiplexer;
use hive_adapters::store::MemoryTaskStore;
use hive_adapters::worktree::FakeWorktrees;
use hive_adapters::FakeEscalation;
use hive_core::{FakeClock, OrchestratorConfig, OrchestratorEvent, Task};
use hive_engine::{Orchestrator, OrchestratorDeps};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

pub const CLAUDE_READY: &str = "> \n? for shortcuts";
pub const CLAUDE_WORKING: &str = "✻ Working… (esc to interrupt)";

pub type SpecOrchestrator =
    Orchestrator<FakeMultiplexer, FakeEscalation, FakeWorktrees, MemoryTaskStore, FakeClock>;

pub struct SpecHarness {
    pub mux: FakeMultiplexer,
    pub escalation: FakeEscalation,
    pub worktrees: FakeWorktrees,
    pub store: MemoryTaskStore,
    pub clock: FakeClock,
    pub events: Arc<Mutex<Vec<OrchestratorEvent>>>,
    pub dir: tempfile::TempDir,
}

impl SpecHarness {
    pub fn deps(
        &self,
    ) -> OrchestratorDeps<FakeMultiplexer, FakeEscalation, FakeWorktrees, MemoryTaskStore> {
        OrchestratorDeps {
            mux: self.mux.clone(),
            escalation: self.escalation.clone(),
            worktrees: self.worktrees.clone(),
            store: self.store.clone(),
        }
    }

    pub fn events_of(&self, prefix: &str) -> Vec<OrchestratorEvent> {
        self.events
            .lock()
            .iter()
            .filter(|event| event.log_summary().starts_with(prefix))
            .cloned()
            .collect()
    }

    /// The only live worker window's target.
    pub fn sole_target(&self) -> String {
        let targets = self.mux.window_targets();
        assert_eq!(targets.len(), 1, "expected one window, got {:?}", targets);
        targets[0].clone()
    }

    /// Drive fake and tokio clocks together, then tick once.
    pub async fn advance_and_tick(&self, orchestrator: &mut SpecOrchestrator, ms: u64) {
        self.clock.advance(Duration::from_millis(ms));
        tokio::time::advance(Duration::from_millis(ms)).await;
        orchestrator.tick().await;
    }
}

pub fn harness_with(mut config: OrchestratorConfig) -> (SpecHarness, SpecOrchestrator) {
    let mux = FakeMultiplexer::new();
    mux.set_default_pane(CLAUDE_READY);
    let escalation = FakeEscalation::new();
    let worktrees = FakeWorktrees::new();
    let store = MemoryTaskStore::new();
    let clock = FakeClock::new();
    let dir = tempfile::tempdir().unwrap();
    config.repo_root = Some(dir.path().to_path_buf());

    let harness = SpecHarness {
        mux: mux.clone(),
        escalation: escalation.clone(),
        worktrees: worktrees.clone(),
        store: store.clone(),
        clock: clock.clone(),
        events: Arc::new(Mutex::new(Vec::new())),
        dir,
    };

    let mut orchestrator = Orchestrator::new(harness.deps(), clock, config);
    orchestrator.set_state_path(harness.dir.path().join("orchestration-state.json"));
    let sink = harness.events.clone();
    orchestrator.set_event_handler(Box::new(move |event| {
        sink.lock().push(event.clone());
    }));

    (harness, orchestrator)
}

pub fn harness() -> (SpecHarness, SpecOrchestrator) {
    harness_with(OrchestratorConfig::default())
}

pub fn claude_task(id: &str) -> Task {
    Task::new(id, "claude", format!("prompt for {}", id), 0)
}

/// Keep the fake clock moving while `run_spec` owns the loop.
pub fn drive_clock(clock: &FakeClock) -> tokio::task::JoinHandle<()> {
    let clock = clock.clone();
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(Duration::from_millis(50)).await;
            clock.advance(Duration::from_millis(1_000));
        }
    })
}
