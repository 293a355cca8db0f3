// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Events emitted by the orchestrator to its in-process observer.
//!
//! Serializes with `{"type": "task:assigned", ...fields}` tags so callers
//! can append events to JSONL logs directly.

use crate::action::OrchestratorAction;
use crate::task::TaskId;
use crate::worker::{WorkerId, WorkerState};
use serde::{Deserialize, Serialize};

/// Observable state transitions in the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum OrchestratorEvent {
    #[serde(rename = "worker:created")]
    WorkerCreated { worker_id: WorkerId, tool: String },

    #[serde(rename = "task:assigned")]
    TaskAssigned {
        task_id: TaskId,
        worker_id: WorkerId,
    },

    #[serde(rename = "worker:state_changed")]
    StateChanged {
        worker_id: WorkerId,
        from: WorkerState,
        to: WorkerState,
    },

    #[serde(rename = "worker:action")]
    ActionTaken {
        worker_id: WorkerId,
        action: OrchestratorAction,
    },

    #[serde(rename = "task:completed")]
    TaskCompleted {
        task_id: TaskId,
        worker_id: WorkerId,
    },

    #[serde(rename = "task:failed")]
    TaskFailed { task_id: TaskId, reason: String },

    #[serde(rename = "worker:died")]
    WorkerDied {
        worker_id: WorkerId,
        /// Task returned to the pending queue, if one was assigned
        #[serde(default, skip_serializing_if = "Option::is_none")]
        requeued_task: Option<TaskId>,
    },

    #[serde(rename = "worker:restarted")]
    WorkerRestarted { worker_id: WorkerId },

    #[serde(rename = "escalation:resolved")]
    LlmEscalation {
        worker_id: WorkerId,
        raw_response: String,
        action: OrchestratorAction,
        duration_ms: u64,
    },
}

impl OrchestratorEvent {
    /// One-line summary for tracing output.
    pub fn log_summary(&self) -> String {
        match self {
            OrchestratorEvent::WorkerCreated { worker_id, tool } => {
                format!("worker:created {} ({})", worker_id, tool)
            }
            OrchestratorEvent::TaskAssigned { task_id, worker_id } => {
                format!("task:assigned {} -> {}", task_id, worker_id)
            }
            OrchestratorEvent::StateChanged {
                worker_id,
                from,
                to,
            } => format!("worker:state_changed {} {} -> {}", worker_id, from, to),
            OrchestratorEvent::ActionTaken { worker_id, action } => {
                format!("worker:action {} {}", worker_id, action.name())
            }
            OrchestratorEvent::TaskCompleted { task_id, worker_id } => {
                format!("task:completed {} on {}", task_id, worker_id)
            }
            OrchestratorEvent::TaskFailed { task_id, reason } => {
                format!("task:failed {}: {}", task_id, reason)
            }
            OrchestratorEvent::WorkerDied {
                worker_id,
                requeued_task,
            } => match requeued_task {
                Some(task_id) => format!("worker:died {} (requeued {})", worker_id, task_id),
                None => format!("worker:died {}", worker_id),
            },
            OrchestratorEvent::WorkerRestarted { worker_id } => {
                format!("worker:restarted {}", worker_id)
            }
            OrchestratorEvent::LlmEscalation {
                worker_id,
                action,
                duration_ms,
                ..
            } => format!(
                "escalation:resolved {} -> {} ({}ms)",
                worker_id,
                action.name(),
                duration_ms
            ),
        }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
