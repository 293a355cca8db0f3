// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn prompt_preview_truncates_at_limit() {
    let short = "implement the widget";
    assert_eq!(prompt_preview(short), short);

    let long = "x".repeat(300);
    assert_eq!(prompt_preview(&long).len(), PROMPT_PREVIEW_LEN);
}

#[test]
fn prompt_preview_respects_char_boundaries() {
    // 119 ASCII bytes then a multi-byte char straddling the limit
    let mut prompt = "a".repeat(119);
    prompt.push('✻');
    prompt.push_str(&"b".repeat(50));
    let preview = prompt_preview(&prompt);
    assert!(preview.len() <= PROMPT_PREVIEW_LEN);
    assert_eq!(preview, "a".repeat(119));
}

#[tokio::test]
async fn write_creates_parents_and_roundtrips() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("orchestration-state.json");

    let state = SessionState {
        status: "running".into(),
        workers: vec![WorkerSummary {
            id: "claude-ab12".into(),
            tool: "claude".into(),
            state: WorkerState::Working,
            task_id: Some("t-1".into()),
            task_prompt: Some("build the thing".into()),
            tasks_completed: 2,
            assigned_at_ms: Some(1_000),
        }],
        pending_task_count: 3,
        completed_task_count: 5,
        failed_task_count: 1,
        updated_at_ms: 99_000,
    };
    write_session_state(&path, &state).await.unwrap();

    let raw = std::fs::read_to_string(&path).unwrap();
    let back: SessionState = serde_json::from_str(&raw).unwrap();
    assert_eq!(back, state);
}

#[tokio::test]
async fn stopped_state_is_cleared() {
    let state = SessionState::stopped(5_000);
    assert_eq!(state.status, "stopped");
    assert!(state.workers.is_empty());
    assert_eq!(state.pending_task_count, 0);
}

#[test]
fn worker_summary_omits_absent_task_fields() {
    let summary = WorkerSummary {
        id: "claude-1".into(),
        tool: "claude".into(),
        state: WorkerState::Idle,
        task_id: None,
        task_prompt: None,
        tasks_completed: 0,
        assigned_at_ms: None,
    };
    let json = serde_json::to_value(&summary).unwrap();
    assert!(json.get("task_id").is_none());
    assert!(json.get("task_prompt").is_none());
}
