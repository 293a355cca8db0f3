// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The orchestrator control loop.
//!
//! Owns the worker pool and the pending queue. Each tick: dispatch pending
//! tasks, monitor every worker (classify state, decide, act), reap dead
//! workers, publish the session-state snapshot. Ticks are serialized; the
//! only intra-engine concurrency is the shutdown fan-out.
//!
//! Split the way the work splits: `dispatch` (pending → workers), `monitor`
//! (workers → actions), `actions` (action execution and task bookkeeping).

mod actions;
mod dispatch;
mod monitor;

use crate::decision::ResponseEngine;
use crate::session_state::{
    default_state_path, prompt_preview, write_session_state, SessionState, WorkerSummary,
};
use crate::worker::WorkerSession;
use hive_adapters::multiplexer::MultiplexerAdapter;
use hive_adapters::store::TaskStore;
use hive_adapters::worktree::WorktreeAdapter;
use hive_adapters::EscalationAdapter;
use hive_core::{
    Clock, OrchestratorConfig, OrchestratorEvent, Task, TaskId, TaskStatus, UuidIdGen, WorkerId,
    WorkerInfo,
};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Callback receiving every orchestrator event.
pub type EventHandler = Box<dyn Fn(&OrchestratorEvent) + Send + Sync>;

/// External collaborators the orchestrator drives.
pub struct OrchestratorDeps<M, E, W, S> {
    pub mux: M,
    pub escalation: E,
    pub worktrees: W,
    pub store: S,
}

impl<M: Clone, E: Clone, W: Clone, S: Clone> Clone for OrchestratorDeps<M, E, W, S> {
    fn clone(&self) -> Self {
        Self {
            mux: self.mux.clone(),
            escalation: self.escalation.clone(),
            worktrees: self.worktrees.clone(),
            store: self.store.clone(),
        }
    }
}

/// The orchestration engine.
pub struct Orchestrator<M, E, W, S, C>
where
    M: MultiplexerAdapter,
    E: EscalationAdapter,
    W: WorktreeAdapter,
    S: TaskStore,
    C: Clock,
{
    pub(crate) deps: OrchestratorDeps<M, E, W, S>,
    pub(crate) clock: C,
    pub(crate) config: OrchestratorConfig,
    pub(crate) workers: HashMap<WorkerId, WorkerSession<M, C>>,
    pub(crate) pending: Vec<Task>,
    pub(crate) completed_task_ids: HashSet<TaskId>,
    pub(crate) failed_tasks: HashMap<TaskId, String>,
    /// Per-tool resume deadlines (epoch ms) after rate limits
    pub(crate) provider_cooldowns: HashMap<String, u64>,
    /// Completed task → the worker that ran it (affinity routing)
    pub(crate) task_worker_affinity: HashMap<TaskId, WorkerId>,
    /// Dependency hints recorded at queue time
    pub(crate) task_dependencies: HashMap<TaskId, Vec<TaskId>>,
    pub(crate) dispatch_retries: HashMap<TaskId, u32>,
    pub(crate) response_engines: HashMap<String, ResponseEngine>,
    pub(crate) idgen: UuidIdGen,
    running: Arc<AtomicBool>,
    shut_down: bool,
    on_event: Option<EventHandler>,
    state_path: PathBuf,
}

impl<M, E, W, S, C> Orchestrator<M, E, W, S, C>
where
    M: MultiplexerAdapter,
    E: EscalationAdapter,
    W: WorktreeAdapter,
    S: TaskStore,
    C: Clock,
{
    pub fn new(deps: OrchestratorDeps<M, E, W, S>, clock: C, config: OrchestratorConfig) -> Self {
        Self {
            deps,
            clock,
            config,
            workers: HashMap::new(),
            pending: Vec::new(),
            completed_task_ids: HashSet::new(),
            failed_tasks: HashMap::new(),
            provider_cooldowns: HashMap::new(),
            task_worker_affinity: HashMap::new(),
            task_dependencies: HashMap::new(),
            dispatch_retries: HashMap::new(),
            response_engines: HashMap::new(),
            idgen: UuidIdGen,
            running: Arc::new(AtomicBool::new(false)),
            shut_down: false,
            on_event: None,
            state_path: default_state_path(),
        }
    }

    /// Install the event callback (one observer).
    pub fn set_event_handler(&mut self, handler: EventHandler) {
        self.on_event = Some(handler);
    }

    /// Override the session-state snapshot path (tests, parallel engines).
    pub fn set_state_path(&mut self, path: impl Into<PathBuf>) {
        self.state_path = path.into();
    }

    /// Queue a task. Its `depends_on` IDs become affinity hints, not
    /// dispatch barriers.
    pub async fn queue_task(&mut self, task: Task) {
        self.task_dependencies
            .insert(task.id.clone(), task.depends_on.clone());
        self.persist_task(&task).await;
        tracing::info!(task_id = %task.id, tool = %task.agent, "task queued");
        self.pending.push(task);
    }

    pub async fn queue_tasks(&mut self, tasks: Vec<Task>) {
        for task in tasks {
            self.queue_task(task).await;
        }
    }

    /// One control-loop iteration: dispatch, monitor, reap, snapshot.
    pub async fn tick(&mut self) {
        self.dispatch_pending().await;
        self.monitor_workers().await;
        self.reap_dead_workers().await;
        self.write_snapshot("running").await;
    }

    /// Run the loop until the queue drains and no worker holds a task,
    /// then shut down. SIGINT/SIGTERM interrupt the loop gracefully.
    pub async fn start(&mut self) {
        if !self.config.enabled {
            tracing::warn!("orchestration disabled by config, not starting");
            return;
        }
        self.running.store(true, Ordering::SeqCst);

        #[cfg(unix)]
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()).ok();

        loop {
            if !self.running.load(Ordering::SeqCst) {
                tracing::info!("orchestrator interrupted, shutting down");
                break;
            }

            self.tick().await;

            if self.pending.is_empty()
                && self.workers.values().all(|w| w.assignment().is_none())
            {
                tracing::info!("queue drained, orchestrator stopping");
                break;
            }

            let sleep = tokio::time::sleep(Duration::from_millis(self.config.tick_interval_ms));
            #[cfg(unix)]
            {
                let sigterm_recv = async {
                    match sigterm.as_mut() {
                        Some(signal) => {
                            signal.recv().await;
                        }
                        None => std::future::pending::<()>().await,
                    }
                };
                tokio::select! {
                    _ = sleep => {}
                    _ = tokio::signal::ctrl_c() => self.running.store(false, Ordering::SeqCst),
                    _ = sigterm_recv => self.running.store(false, Ordering::SeqCst),
                }
            }
            #[cfg(not(unix))]
            {
                tokio::select! {
                    _ = sleep => {}
                    _ = tokio::signal::ctrl_c() => self.running.store(false, Ordering::SeqCst),
                }
            }
        }

        self.shutdown().await;
    }

    /// Stop everything: workers concurrently, pending tasks cancelled,
    /// snapshot cleared, session killed. Idempotent.
    pub async fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;
        self.running.store(false, Ordering::SeqCst);
        tracing::info!(workers = self.workers.len(), "orchestrator shutting down");

        let stops = self
            .workers
            .drain()
            .map(|(_, mut worker)| async move {
                worker.stop().await;
            })
            .collect::<Vec<_>>();
        futures::future::join_all(stops).await;

        for mut task in std::mem::take(&mut self.pending) {
            task.status = TaskStatus::Cancelled;
            self.persist_task(&task).await;
        }

        let stopped = SessionState::stopped(self.clock.epoch_ms());
        if let Err(err) = write_session_state(&self.state_path, &stopped).await {
            tracing::debug!(error = %err, "failed to clear session state");
        }

        if let Err(err) = self.deps.mux.kill_session().await {
            tracing::debug!(error = %err, "failed to kill multiplexer session");
        }
    }

    // === Queries ===

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn is_task_completed(&self, id: &TaskId) -> bool {
        self.completed_task_ids.contains(id)
    }

    pub fn is_task_failed(&self, id: &TaskId) -> bool {
        self.failed_tasks.contains_key(id)
    }

    pub fn failure_reason(&self, id: &TaskId) -> Option<&str> {
        self.failed_tasks.get(id).map(String::as_str)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Worker views, sorted by ID for deterministic output.
    pub fn worker_states(&self) -> Vec<WorkerInfo> {
        let mut infos: Vec<WorkerInfo> = self.workers.values().map(|w| w.info()).collect();
        infos.sort_by(|a, b| a.id.as_str().cmp(b.id.as_str()));
        infos
    }

    // === Internals shared by the submodules ===

    /// Worker IDs in deterministic visit order.
    pub(crate) fn worker_visit_order(&self) -> Vec<WorkerId> {
        let mut ids: Vec<WorkerId> = self.workers.keys().cloned().collect();
        ids.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        ids
    }

    /// Emit an event to the callback; a panicking handler never disturbs
    /// the loop.
    pub(crate) fn emit(&self, event: OrchestratorEvent) {
        tracing::info!(event = %event.log_summary(), "event");
        if let Some(handler) = &self.on_event {
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                handler(&event);
            }));
            if result.is_err() {
                tracing::warn!(event = %event.log_summary(), "event handler panicked");
            }
        }
    }

    /// Best-effort task persistence.
    pub(crate) async fn persist_task(&self, task: &Task) {
        if let Err(err) = self.deps.store.save(task).await {
            tracing::warn!(task_id = %task.id, error = %err, "task persistence failed");
        }
    }

    /// Reap workers whose windows died: requeue their assignment, emit
    /// `worker:died`, remove them from the pool.
    pub(crate) async fn reap_dead_workers(&mut self) {
        for id in self.worker_visit_order() {
            let Some(worker) = self.workers.get(&id) else {
                continue;
            };
            let gone =
                worker.state() == hive_core::WorkerState::Dead || !worker.is_alive().await;
            if !gone {
                continue;
            }

            let Some(mut worker) = self.workers.remove(&id) else {
                continue;
            };
            let requeued = worker.take_assignment().map(|mut task| {
                task.mark_requeued();
                let task_id = task.id.clone();
                self.pending.push(task);
                task_id
            });
            tracing::warn!(worker_id = %id, requeued = ?requeued, "worker died");
            self.emit(OrchestratorEvent::WorkerDied {
                worker_id: id,
                requeued_task: requeued,
            });
        }
    }

    /// Publish the session-state snapshot; failures are debug-logged.
    pub(crate) async fn write_snapshot(&self, status: &str) {
        let workers = self
            .worker_states()
            .into_iter()
            .map(|info| {
                let assignment = info.assignment.as_ref();
                WorkerSummary {
                    id: info.id.clone(),
                    tool: info.tool.clone(),
                    state: info.state,
                    task_id: assignment.map(|a| a.task.id.clone()),
                    task_prompt: assignment.map(|a| prompt_preview(&a.task.prompt)),
                    tasks_completed: info.tasks_completed,
                    assigned_at_ms: assignment.map(|a| a.assigned_at_ms),
                }
            })
            .collect();

        let state = SessionState {
            status: status.to_string(),
            workers,
            pending_task_count: self.pending.len(),
            completed_task_count: self.completed_task_ids.len(),
            failed_task_count: self.failed_tasks.len(),
            updated_at_ms: self.clock.epoch_ms(),
        };
        if let Err(err) = write_session_state(&self.state_path, &state).await {
            tracing::debug!(error = %err, "session snapshot write failed");
        }
    }
}

#[cfg(test)]
#[path = "../orchestrator_tests/mod.rs"]
mod tests;
