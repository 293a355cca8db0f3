//! Spec: sequential waves.
//!
//! Tasks `a, b` with `b` depending on `a` compute to two waves; both run to
//! completion and the persisted launch session walks pending → running →
//! completed.

use crate::prelude::*;
use hive_core::OrchestratorConfig;
use hive_engine::{compute_waves, run_spec, RunStatus, Spec, SpecRunOptions, SpecTask};

fn spec() -> Spec {
    Spec {
        name: "two-step".into(),
        goal: "sequential".into(),
        tasks: vec![
            SpecTask {
                id: "a".into(),
                prompt: "first".into(),
                agent: None,
                depends_on: vec![],
            },
            SpecTask {
                id: "b".into(),
                prompt: "second".into(),
                agent: None,
                depends_on: vec!["a".into()],
            },
        ],
    }
}

fn options(harness: &SpecHarness) -> SpecRunOptions {
    let mut config = OrchestratorConfig::default();
    config.idle_settling_ms = 0;
    config.repo_root = Some(harness.dir.path().to_path_buf());
    SpecRunOptions {
        config,
        session_dir: Some(harness.dir.path().to_path_buf()),
        state_path: Some(harness.dir.path().join("orchestration-state.json")),
        wave_poll_ms: 100,
        max_wave_polls: 100,
        ..SpecRunOptions::default()
    }
}

#[test]
fn dependency_makes_two_waves() {
    let waves = compute_waves(&spec().tasks).unwrap();
    assert_eq!(waves, vec![vec!["a".to_string()], vec!["b".to_string()]]);
}

#[tokio::test(start_paused = true)]
async fn both_waves_complete_in_order() {
    let (harness, _unused) = harness();
    let driver = drive_clock(&harness.clock);

    let result = run_spec(
        &spec(),
        harness.deps(),
        harness.clock.clone(),
        options(&harness),
    )
    .await
    .unwrap();
    driver.abort();

    assert_eq!(result.status, RunStatus::Completed);
    assert_eq!(result.waves.len(), 2);
    assert_eq!(result.waves[0].completed, vec!["a"]);
    assert_eq!(result.waves[1].completed, vec!["b"]);

    let raw = std::fs::read_to_string(harness.dir.path().join("two-step-session.json")).unwrap();
    let session: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(session["status"], "completed");
    assert_eq!(session["waves"][0]["status"], "completed");
    assert_eq!(session["waves"][1]["status"], "completed");
    assert_eq!(session["waves"][1]["tasks"][0]["spec_id"], "b");
}
