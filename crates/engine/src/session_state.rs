// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process-global session-state snapshot.
//!
//! Rewritten every tick while the orchestrator runs so external observers
//! (dashboards, `ps`-style CLIs) can read live state without talking to the
//! process. Best-effort: write failures are logged at debug and ignored.

use hive_core::{TaskId, WorkerId, WorkerState};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Longest task-prompt preview embedded per worker.
pub const PROMPT_PREVIEW_LEN: usize = 120;

/// One worker's line in the snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerSummary {
    pub id: WorkerId,
    pub tool: String,
    pub state: WorkerState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<TaskId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_prompt: Option<String>,
    pub tasks_completed: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_at_ms: Option<u64>,
}

/// The snapshot document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    /// `running` or `stopped`
    pub status: String,
    pub workers: Vec<WorkerSummary>,
    pub pending_task_count: usize,
    pub completed_task_count: usize,
    pub failed_task_count: usize,
    pub updated_at_ms: u64,
}

impl SessionState {
    /// The cleared document written at shutdown.
    pub fn stopped(updated_at_ms: u64) -> Self {
        Self {
            status: "stopped".to_string(),
            workers: Vec::new(),
            pending_task_count: 0,
            completed_task_count: 0,
            failed_task_count: 0,
            updated_at_ms,
        }
    }
}

/// Default snapshot location: `~/.openhive/orchestration-state.json`.
pub fn default_state_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".openhive")
        .join("orchestration-state.json")
}

/// Truncate a prompt for embedding in the snapshot.
pub fn prompt_preview(prompt: &str) -> String {
    if prompt.len() <= PROMPT_PREVIEW_LEN {
        return prompt.to_string();
    }
    let mut end = PROMPT_PREVIEW_LEN;
    while !prompt.is_char_boundary(end) {
        end -= 1;
    }
    prompt[..end].to_string()
}

/// Write the snapshot, creating parent directories as needed.
pub async fn write_session_state(path: &Path, state: &SessionState) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let json = serde_json::to_vec_pretty(state).map_err(std::io::Error::other)?;
    tokio::fs::write(path, json).await
}

#[cfg(test)]
#[path = "session_state_tests.rs"]
mod tests;
