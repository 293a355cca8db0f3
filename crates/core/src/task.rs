// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task identifier and lifecycle record.
//!
//! A task is created by the caller, owned by the orchestrator from queue-time
//! until it reaches a terminal status, then flushed to the task store.

use crate::worker::{WorkerId, WorkerState};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

crate::define_id! {
    /// Caller-supplied stable identifier for a task.
    pub struct TaskId;
}

/// Lifecycle status of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Queued, not yet assigned to a worker
    Pending,
    /// Assigned to a worker and being driven
    Running,
    /// Worker finished and the completion settled
    Completed,
    /// Terminal failure (dispatch, timeout, denial, or agent error)
    Failed,
    /// Cancelled by shutdown before dispatch
    Cancelled,
}

impl TaskStatus {
    /// Whether the task will never change status again.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled
        )
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskStatus::Pending => write!(f, "pending"),
            TaskStatus::Running => write!(f, "running"),
            TaskStatus::Completed => write!(f, "completed"),
            TaskStatus::Failed => write!(f, "failed"),
            TaskStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// A unit of work dispatched to one agent TUI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    /// Prompt text typed into the agent when the task is assigned
    pub prompt: String,
    /// Tool selector ("claude", "codex", "gemini")
    pub agent: String,
    /// IDs of tasks this one depends on (affinity hints at dispatch)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<TaskId>,
    pub status: TaskStatus,
    pub created_at_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    /// Mirror of the assigned worker's detected state, for observers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker_state: Option<WorkerState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worktree_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worktree_branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker_id: Option<WorkerId>,
}

impl Task {
    /// Create a pending task.
    pub fn new(
        id: impl Into<TaskId>,
        agent: impl Into<String>,
        prompt: impl Into<String>,
        created_at_ms: u64,
    ) -> Self {
        Self {
            id: id.into(),
            prompt: prompt.into(),
            agent: agent.into(),
            depends_on: Vec::new(),
            status: TaskStatus::Pending,
            created_at_ms,
            started_at_ms: None,
            completed_at_ms: None,
            duration_ms: None,
            worker_state: None,
            worktree_path: None,
            worktree_branch: None,
            error: None,
            worker_id: None,
        }
    }

    /// Builder-style dependency attachment.
    pub fn with_depends_on(mut self, deps: Vec<TaskId>) -> Self {
        self.depends_on = deps;
        self
    }

    /// Mark the task running on the given worker.
    pub fn mark_started(&mut self, worker: &WorkerId, now_ms: u64) {
        self.status = TaskStatus::Running;
        self.started_at_ms = Some(now_ms);
        self.worker_id = Some(worker.clone());
    }

    /// Mark the task completed, recording duration from start (or creation).
    pub fn mark_completed(&mut self, now_ms: u64) {
        self.status = TaskStatus::Completed;
        self.completed_at_ms = Some(now_ms);
        let since = self.started_at_ms.unwrap_or(self.created_at_ms);
        self.duration_ms = Some(now_ms.saturating_sub(since));
        self.worker_state = None;
    }

    /// Mark the task failed with a reason.
    pub fn mark_failed(&mut self, reason: impl Into<String>, now_ms: u64) {
        self.status = TaskStatus::Failed;
        self.completed_at_ms = Some(now_ms);
        let since = self.started_at_ms.unwrap_or(self.created_at_ms);
        self.duration_ms = Some(now_ms.saturating_sub(since));
        self.error = Some(reason.into());
        self.worker_state = None;
    }

    /// Return the task to the pending queue after its worker died.
    pub fn mark_requeued(&mut self) {
        self.status = TaskStatus::Pending;
        self.started_at_ms = None;
        self.worker_state = None;
        self.worker_id = None;
    }
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
