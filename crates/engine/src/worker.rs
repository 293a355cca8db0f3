// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker session lifecycle.
//!
//! One `WorkerSession` per subprocess: it owns a multiplexer window and a
//! pipe file, types prompts into the TUI, and turns captured pane text into
//! state snapshots. The orchestrator owns the sessions and drives them from
//! its tick; nothing here runs concurrently with itself.

use crate::detector::{refine_state, StateDetector};
use crate::profile::{profile_for, ProfileError, ToolProfile};
use hive_adapters::multiplexer::{wait_for_ready, MultiplexerAdapter, MultiplexerError, ReadyPoll};
use hive_adapters::text::strip_ansi;
use hive_core::{
    Clock, OrchestratorConfig, StateSnapshot, Task, TaskAssignment, WorkerId, WorkerState,
};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Scrollback lines included in pane captures.
const CAPTURE_SCROLLBACK: i32 = -60;

/// Pause after readiness before the TUI accepts input reliably.
const START_SETTLE: Duration = Duration::from_secs(2);

/// Pause between stop and start during a restart.
const RESTART_PAUSE: Duration = Duration::from_secs(1);

/// Logs directory relative to the worker's working directory.
const LOGS_DIR: &str = ".openhive/logs";

/// Errors from worker operations
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error(transparent)]
    Profile(#[from] ProfileError),
    #[error("multiplexer error: {0}")]
    Mux(#[from] MultiplexerError),
    #[error("worker {id} is {state}, cannot accept a task")]
    NotIdle { id: WorkerId, state: WorkerState },
    #[error("worker {0} has not been started")]
    NotStarted(WorkerId),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// One interactive agent subprocess inside a multiplexer window.
pub struct WorkerSession<M: MultiplexerAdapter, C: Clock> {
    mux: M,
    clock: C,
    config: OrchestratorConfig,
    profile: &'static ToolProfile,
    detector: StateDetector,
    id: WorkerId,
    tool: String,
    cwd: Option<PathBuf>,
    target: Option<String>,
    state: WorkerState,
    assignment: Option<TaskAssignment>,
    tasks_completed: u32,
    pipe_file: PathBuf,
    last_pipe_size: u64,
    last_check_at_ms: u64,
    last_output_change_at_ms: u64,
    created_at_ms: u64,
}

impl<M: MultiplexerAdapter, C: Clock> WorkerSession<M, C> {
    /// Create a stopped session for `tool`. Fails for tools without an
    /// orchestration profile.
    pub fn new(
        id: WorkerId,
        tool: &str,
        config: OrchestratorConfig,
        mux: M,
        clock: C,
        cwd: Option<PathBuf>,
    ) -> Result<Self, WorkerError> {
        let profile = profile_for(tool)?;
        let base = cwd.clone().unwrap_or_else(|| PathBuf::from("."));
        let pipe_file = base.join(LOGS_DIR).join(format!("worker-{}.pipe", id));
        let created_at_ms = clock.epoch_ms();
        Ok(Self {
            mux,
            clock,
            config,
            profile,
            detector: StateDetector::new(profile),
            id,
            tool: tool.to_string(),
            cwd,
            target: None,
            state: WorkerState::Starting,
            assignment: None,
            tasks_completed: 0,
            pipe_file,
            last_pipe_size: 0,
            last_check_at_ms: 0,
            last_output_change_at_ms: created_at_ms,
            created_at_ms,
        })
    }

    pub fn id(&self) -> &WorkerId {
        &self.id
    }

    pub fn tool(&self) -> &str {
        &self.tool
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    pub fn assignment(&self) -> Option<&TaskAssignment> {
        self.assignment.as_ref()
    }

    pub fn tasks_completed(&self) -> u32 {
        self.tasks_completed
    }

    pub fn pipe_file(&self) -> &Path {
        &self.pipe_file
    }

    pub fn last_check_at_ms(&self) -> u64 {
        self.last_check_at_ms
    }

    /// Whether this worker should be recycled instead of reused.
    pub fn due_for_recycle(&self, max_tasks_per_worker: u32) -> bool {
        max_tasks_per_worker > 0 && self.tasks_completed >= max_tasks_per_worker
    }

    /// Snapshot of identity and counters for rules, events, and observers.
    pub fn info(&self) -> hive_core::WorkerInfo {
        hive_core::WorkerInfo {
            id: self.id.clone(),
            tool: self.tool.clone(),
            target: self.target.clone().unwrap_or_default(),
            state: self.state,
            assignment: self.assignment.clone(),
            tasks_completed: self.tasks_completed,
            pipe_file: self.pipe_file.clone(),
            last_pipe_size: self.last_pipe_size,
            last_check_at_ms: self.last_check_at_ms,
            last_output_change_at_ms: self.last_output_change_at_ms,
            created_at_ms: self.created_at_ms,
        }
    }

    /// The orchestrator linearizes state transitions through its tick.
    pub fn set_state(&mut self, state: WorkerState) {
        self.state = state;
    }

    /// Mirror the detected state onto the assigned task for observers.
    pub fn mirror_state_to_task(&mut self, state: WorkerState) {
        if let Some(assignment) = self.assignment.as_mut() {
            assignment.task.worker_state = Some(state);
        }
    }

    /// Postpone the next monitoring visit until `until_ms`.
    pub fn postpone_until(&mut self, until_ms: u64) {
        self.last_check_at_ms = until_ms;
    }

    /// Start the TUI: window, pipe, readiness, settle, idle.
    pub async fn start(&mut self) -> Result<(), WorkerError> {
        self.mux.ensure_session().await?;

        if let Some(parent) = self.pipe_file.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        // Truncate so lastPipeSize starts at zero for this lifetime
        tokio::fs::write(&self.pipe_file, b"").await?;

        let command = self.profile.start_command_line();
        tracing::info!(worker_id = %self.id, tool = %self.tool, command = %command, "starting worker");

        let target = self
            .mux
            .create_window(self.id.as_str(), &command, self.cwd.as_deref())
            .await?;
        self.mux.start_pipe_pane(&target, &self.pipe_file).await?;

        wait_for_ready(
            &self.mux,
            &target,
            &self.profile.ready_pattern,
            self.profile.startup_dialog_pattern.as_ref(),
            ReadyPoll::default(),
        )
        .await?;

        // TUIs repaint after the ready banner; give them a beat
        tokio::time::sleep(START_SETTLE).await;

        self.target = Some(target);
        self.state = WorkerState::Idle;
        self.last_pipe_size = 0;
        self.last_output_change_at_ms = self.clock.epoch_ms();
        Ok(())
    }

    /// Assign a task and type its prompt. Rejects non-idle workers.
    pub async fn assign_task(&mut self, task: Task) -> Result<(), WorkerError> {
        if self.state != WorkerState::Idle {
            return Err(WorkerError::NotIdle {
                id: self.id.clone(),
                state: self.state,
            });
        }
        let target = self.target()?.to_string();
        let now = self.clock.epoch_ms();
        let prompt = task.prompt.clone();

        self.assignment = Some(TaskAssignment::new(task, now));
        if let Err(err) = self.mux.send_text(&target, &prompt).await {
            // A half-assigned worker would settle into a bogus completion
            self.assignment = None;
            return Err(err.into());
        }
        self.state = WorkerState::Working;
        Ok(())
    }

    /// Cheap output-change probe via the pipe file's size.
    pub async fn has_new_output(&mut self) -> bool {
        let size = self.mux.get_file_size(&self.pipe_file).await;
        if size > self.last_pipe_size {
            self.last_pipe_size = size;
            self.last_output_change_at_ms = self.clock.epoch_ms();
            return true;
        }
        false
    }

    /// Capture, classify, refine, and update idle-settling bookkeeping.
    pub async fn detect_state(&mut self) -> Result<StateSnapshot, WorkerError> {
        let target = self.target()?.to_string();
        let pane = self.mux.capture_pane(&target, CAPTURE_SCROLLBACK).await?;
        let now = self.clock.epoch_ms();

        let snapshot = self.detector.detect(&strip_ansi(&pane), now);
        let snapshot = refine_state(
            snapshot,
            self.last_output_change_at_ms,
            self.stuck_timeout_ms(),
        );

        if let Some(assignment) = self.assignment.as_mut() {
            if snapshot.state == WorkerState::Idle {
                if assignment.idle_detected_at_ms.is_none() {
                    assignment.idle_detected_at_ms = Some(now);
                }
            } else {
                assignment.idle_detected_at_ms = None;
                assignment.has_worked = true;
            }
        }

        self.last_check_at_ms = now;
        Ok(snapshot)
    }

    /// Confirm the TUI's pending dialog.
    pub async fn approve(&mut self) -> Result<(), WorkerError> {
        let target = self.target()?.to_string();
        self.mux.send_keys(&target, &["Enter".to_string()]).await?;
        Ok(())
    }

    /// Send the tool's dismiss key.
    pub async fn dismiss(&mut self) -> Result<(), WorkerError> {
        let target = self.target()?.to_string();
        let key = self.profile.dismiss_key.to_string();
        self.mux.send_keys(&target, &[key]).await?;
        Ok(())
    }

    pub async fn send_keys_to_agent(&mut self, keys: &[String]) -> Result<(), WorkerError> {
        let target = self.target()?.to_string();
        self.mux.send_keys(&target, keys).await?;
        Ok(())
    }

    pub async fn send_text_to_agent(&mut self, text: &str) -> Result<(), WorkerError> {
        let target = self.target()?.to_string();
        self.mux.send_text(&target, text).await?;
        Ok(())
    }

    /// Drop the assignment as completed; worker returns to idle.
    pub fn mark_task_complete(&mut self) -> Option<Task> {
        let assignment = self.assignment.take()?;
        self.tasks_completed += 1;
        self.state = WorkerState::Idle;
        Some(assignment.task)
    }

    /// Drop the assignment as failed; worker returns to idle.
    pub fn mark_task_failed(&mut self) -> Option<Task> {
        let assignment = self.assignment.take()?;
        self.state = WorkerState::Idle;
        Some(assignment.task)
    }

    /// Take the assignment for requeueing (worker died).
    pub fn take_assignment(&mut self) -> Option<Task> {
        self.assignment.take().map(|a| a.task)
    }

    pub async fn is_alive(&self) -> bool {
        match &self.target {
            Some(target) => self.mux.is_window_alive(target).await.unwrap_or(false),
            None => false,
        }
    }

    /// Stop and start the TUI. Conversation context is not preserved; the
    /// restart begins a new worker lifetime, so completion and pipe counters
    /// reset. A live assignment has its prompt re-sent from scratch.
    pub async fn restart(&mut self) -> Result<(), WorkerError> {
        tracing::info!(worker_id = %self.id, "restarting worker");
        self.stop().await;
        tokio::time::sleep(RESTART_PAUSE).await;
        self.tasks_completed = 0;
        self.start().await?;

        if let Some(assignment) = self.assignment.as_mut() {
            assignment.idle_detected_at_ms = None;
            let prompt = assignment.task.prompt.clone();
            let target = self.target()?.to_string();
            self.mux.send_text(&target, &prompt).await?;
            self.state = WorkerState::Working;
        }
        Ok(())
    }

    /// Tear the window down. Sends the tool's exit sequence first so the TUI
    /// can flush, then kills the window outright.
    pub async fn stop(&mut self) {
        if let Some(target) = self.target.clone() {
            for chord in self.profile.exit_sequence {
                let keys: Vec<String> = chord.iter().map(|k| k.to_string()).collect();
                if self.mux.send_keys(&target, &keys).await.is_err() {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(self.profile.exit_delay_ms)).await;
            }
            let _ = self.mux.stop_pipe_pane(&target).await;
            let _ = self.mux.kill_window(&target).await;
        }
        self.state = WorkerState::Dead;
    }

    fn target(&self) -> Result<&str, WorkerError> {
        self.target
            .as_deref()
            .ok_or_else(|| WorkerError::NotStarted(self.id.clone()))
    }

    fn stuck_timeout_ms(&self) -> u64 {
        if self.config.stuck_timeout_ms > 0 {
            self.config.stuck_timeout_ms
        } else {
            self.profile.stuck_timeout_ms
        }
    }
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
