// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker identity, runtime state, and observation types.
//!
//! A worker is one subprocess hosting an interactive agent TUI inside a
//! multiplexer window. Its state is classified from captured pane text, not
//! reported by the agent itself, so every state here is an observation.

use crate::task::Task;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

crate::define_id! {
    /// Unique identifier for a worker, formatted `{tool}-{shortid}`.
    pub struct WorkerId;
}

/// State of a worker as detected from its pane output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    /// Window created, TUI not yet ready
    Starting,
    /// Prompt visible, no assignment in flight
    Idle,
    /// Agent is producing output
    Working,
    /// TUI is showing a permission / approval dialog
    WaitingApproval,
    /// Agent asked a question and is blocked on input
    WaitingInput,
    /// Provider reported a rate limit
    RateLimited,
    /// Error banner in the pane
    Error,
    /// Working but output has not changed past the stuck timeout
    Stuck,
    /// Window gone or worker stopped
    Dead,
}

impl WorkerState {
    /// States in which a worker may carry a task assignment.
    ///
    /// `Idle` is excluded here even though an assigned worker passes through
    /// it during the idle-settling window; callers that care about the
    /// settling exception check the assignment directly.
    pub fn can_hold_assignment(&self) -> bool {
        !matches!(
            self,
            WorkerState::Idle | WorkerState::Starting | WorkerState::Dead
        )
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerState::Starting => write!(f, "starting"),
            WorkerState::Idle => write!(f, "idle"),
            WorkerState::Working => write!(f, "working"),
            WorkerState::WaitingApproval => write!(f, "waiting_approval"),
            WorkerState::WaitingInput => write!(f, "waiting_input"),
            WorkerState::RateLimited => write!(f, "rate_limited"),
            WorkerState::Error => write!(f, "error"),
            WorkerState::Stuck => write!(f, "stuck"),
            WorkerState::Dead => write!(f, "dead"),
        }
    }
}

/// A task currently held by a worker, with settling bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskAssignment {
    pub task: Task,
    pub assigned_at_ms: u64,
    /// First moment the worker was seen idle after assignment; cleared
    /// whenever the worker leaves idle again.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idle_detected_at_ms: Option<u64>,
    /// Whether the worker has been observed outside idle since assignment
    #[serde(default)]
    pub has_worked: bool,
}

impl TaskAssignment {
    pub fn new(task: Task, assigned_at_ms: u64) -> Self {
        Self {
            task,
            assigned_at_ms,
            idle_detected_at_ms: None,
            has_worked: false,
        }
    }

    /// Whether the worker has dwelled in idle at least `settling_ms`.
    pub fn idle_settled(&self, now_ms: u64, settling_ms: u64) -> bool {
        self.idle_detected_at_ms
            .is_some_and(|since| now_ms.saturating_sub(since) >= settling_ms)
    }
}

/// Public view of a worker's identity and counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerInfo {
    pub id: WorkerId,
    pub tool: String,
    /// Multiplexer target string (`session:window`)
    pub target: String,
    pub state: WorkerState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignment: Option<TaskAssignment>,
    pub tasks_completed: u32,
    pub pipe_file: PathBuf,
    pub last_pipe_size: u64,
    pub last_check_at_ms: u64,
    pub last_output_change_at_ms: u64,
    pub created_at_ms: u64,
}

/// One classification of captured pane output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub state: WorkerState,
    /// Name of the pattern that matched (or a detector-synthesized marker)
    pub matched_pattern: String,
    /// Full pane text, ANSI-stripped
    pub pane_text: String,
    pub timestamp_ms: u64,
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
