//! Spec: one parallel wave.
//!
//! Three independent tasks form a single wave, all complete, and the engine
//! never opens more windows than `max_workers`.

use crate::prelude::*;
use hive_core::OrchestratorConfig;
use hive_engine::{compute_waves, run_spec, RunStatus, Spec, SpecRunOptions, SpecTask};

fn spec() -> Spec {
    Spec {
        name: "fanout".into(),
        goal: String::new(),
        tasks: ["a", "b", "c"]
            .into_iter()
            .map(|id| SpecTask {
                id: id.into(),
                prompt: format!("do {}", id),
                agent: None,
                depends_on: vec![],
            })
            .collect(),
    }
}

#[test]
fn independent_tasks_form_one_wave() {
    let waves = compute_waves(&spec().tasks).unwrap();
    assert_eq!(waves.len(), 1);
    assert_eq!(waves[0].len(), 3);
}

#[tokio::test(start_paused = true)]
async fn wave_completes_without_exceeding_max_workers() {
    let (harness, _orchestrator) = harness();
    let mut config = OrchestratorConfig::default();
    config.idle_settling_ms = 0;
    config.max_workers = 2;
    config.repo_root = Some(harness.dir.path().to_path_buf());

    let driver = drive_clock(&harness.clock);
    let result = run_spec(
        &spec(),
        harness.deps(),
        harness.clock.clone(),
        SpecRunOptions {
            config,
            session_dir: None,
            state_path: Some(harness.dir.path().join("orchestration-state.json")),
            wave_poll_ms: 100,
            max_wave_polls: 100,
            ..SpecRunOptions::default()
        },
    )
    .await
    .unwrap();
    driver.abort();

    assert_eq!(result.status, RunStatus::Completed);
    let mut completed = result.waves[0].completed.clone();
    completed.sort();
    assert_eq!(completed, vec!["a", "b", "c"]);
    assert!(result.waves[0].failed.is_empty());

    // Two windows served three tasks
    assert!(
        harness.mux.window_targets().len() <= 2,
        "windows: {:?}",
        harness.mux.window_targets()
    );
}
