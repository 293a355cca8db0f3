//! Spec: cycle detection.

use hive_engine::{compute_waves, SpecError, SpecTask};

fn task(id: &str, deps: &[&str]) -> SpecTask {
    SpecTask {
        id: id.into(),
        prompt: format!("do {}", id),
        agent: None,
        depends_on: deps.iter().map(|d| d.to_string()).collect(),
    }
}

#[test]
fn two_node_cycle_is_reported_with_both_ids() {
    let err = compute_waves(&[task("a", &["b"]), task("b", &["a"])]).unwrap_err();
    match err {
        SpecError::DependencyCycle(ids) => assert_eq!(ids, vec!["a", "b"]),
        other => panic!("expected cycle error, got {:?}", other),
    }
}

#[test]
fn self_dependency_is_a_cycle() {
    let err = compute_waves(&[task("a", &["a"])]).unwrap_err();
    assert!(matches!(err, SpecError::DependencyCycle(ids) if ids == vec!["a"]));
}

#[test]
fn cycle_behind_valid_waves_reports_only_cyclic_tasks() {
    let tasks = [
        task("setup", &[]),
        task("x", &["setup", "y"]),
        task("y", &["x"]),
    ];
    let err = compute_waves(&tasks).unwrap_err();
    match err {
        SpecError::DependencyCycle(ids) => assert_eq!(ids, vec!["x", "y"]),
        other => panic!("expected cycle error, got {:?}", other),
    }
}
