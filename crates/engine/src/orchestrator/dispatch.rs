// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pending-task dispatch: tool validation, cooldowns, worktrees, worker
//! selection (affinity → idle → create), and assignment.

use super::Orchestrator;
use crate::profile;
use crate::worker::WorkerSession;
use hive_adapters::multiplexer::MultiplexerAdapter;
use hive_adapters::store::TaskStore;
use hive_adapters::worktree::WorktreeAdapter;
use hive_adapters::EscalationAdapter;
use hive_core::{id::worker_id, Clock, OrchestratorEvent, Task, WorkerId, WorkerState};

/// Dispatch attempts (worker creation / assignment failures) before a task
/// fails terminally.
pub(crate) const MAX_DISPATCH_RETRIES: u32 = 5;

/// Which worker (if any) a task should go to this tick.
enum Candidate {
    /// An existing idle worker
    Existing(WorkerId),
    /// Pool below capacity: create a fresh worker
    CreateNew,
    /// Everything busy and at capacity: stay pending, no retry burned
    NoCapacity,
}

impl<M, E, W, S, C> Orchestrator<M, E, W, S, C>
where
    M: MultiplexerAdapter,
    E: EscalationAdapter,
    W: WorktreeAdapter,
    S: TaskStore,
    C: Clock,
{
    pub(crate) async fn dispatch_pending(&mut self) {
        let now = self.clock.epoch_ms();
        let mut remaining: Vec<Task> = Vec::new();

        for mut task in std::mem::take(&mut self.pending) {
            // Configuration errors are terminal immediately
            if !profile::is_supported(&task.agent) {
                let msg = format!("Unsupported tool: {}", task.agent);
                self.finalize_dispatch_failure(&mut task, msg).await;
                continue;
            }

            // Provider in cooldown: the whole tool waits, not just this task
            if let Some(&resume_at) = self.provider_cooldowns.get(&task.agent) {
                if resume_at > now {
                    tracing::debug!(
                        task_id = %task.id,
                        tool = %task.agent,
                        resume_in_ms = resume_at - now,
                        "provider cooling down, skipping dispatch"
                    );
                    remaining.push(task);
                    continue;
                }
                self.provider_cooldowns.remove(&task.agent);
            }

            if self.config.use_worktrees && task.worktree_path.is_none() {
                self.attach_worktree(&mut task).await;
            }

            match self.select_worker(&task) {
                Candidate::Existing(worker_id) => {
                    if let Some(mut task) = self.assign_to(&worker_id, task, now).await {
                        self.note_dispatch_failure(&mut task).await;
                        if task.status != hive_core::TaskStatus::Failed {
                            remaining.push(task);
                        }
                    }
                }
                Candidate::CreateNew => match self.create_worker(&task.agent).await {
                    Ok(worker_id) => {
                        if let Some(mut task) = self.assign_to(&worker_id, task, now).await {
                            self.note_dispatch_failure(&mut task).await;
                            if task.status != hive_core::TaskStatus::Failed {
                                remaining.push(task);
                            }
                        }
                    }
                    Err(err) => {
                        let mut task = task;
                        let attempt = self.bump_retries(&task);
                        if attempt >= MAX_DISPATCH_RETRIES {
                            tracing::error!(
                                task_id = %task.id,
                                tool = %task.agent,
                                attempt,
                                error = %err,
                                "worker creation failed, no retries left"
                            );
                            self.finalize_dispatch_failure(
                                &mut task,
                                format!(
                                    "worker creation failed after {} attempts: {}",
                                    attempt, err
                                ),
                            )
                            .await;
                        } else {
                            tracing::warn!(
                                task_id = %task.id,
                                tool = %task.agent,
                                attempt,
                                error = %err,
                                "worker creation failed, task stays pending"
                            );
                            remaining.push(task);
                        }
                    }
                },
                Candidate::NoCapacity => remaining.push(task),
            }
        }

        self.pending = remaining;
    }

    /// Pick a worker: affinity match first, then any idle worker of the
    /// tool, then a fresh worker if below capacity. Workers due for
    /// recycling are never reused.
    fn select_worker(&self, task: &Task) -> Candidate {
        let deps = self
            .task_dependencies
            .get(&task.id)
            .cloned()
            .unwrap_or_default();
        for dep in &deps {
            if let Some(worker_id) = self.task_worker_affinity.get(dep) {
                if self.worker_is_reusable(worker_id, &task.agent) {
                    tracing::debug!(
                        task_id = %task.id,
                        worker_id = %worker_id,
                        dep = %dep,
                        "affinity dispatch"
                    );
                    return Candidate::Existing(worker_id.clone());
                }
            }
        }

        for worker_id in self.worker_visit_order() {
            if self.worker_is_reusable(&worker_id, &task.agent) {
                return Candidate::Existing(worker_id);
            }
        }

        if self.workers.len() < self.config.max_workers {
            Candidate::CreateNew
        } else {
            Candidate::NoCapacity
        }
    }

    fn worker_is_reusable(&self, worker_id: &WorkerId, tool: &str) -> bool {
        self.workers.get(worker_id).is_some_and(|worker| {
            worker.tool() == tool
                && worker.state() == WorkerState::Idle
                && worker.assignment().is_none()
                && !worker.due_for_recycle(self.config.max_tasks_per_worker)
        })
    }

    /// Assign `task` to a live worker. Returns the task on failure so the
    /// caller can requeue or finalize it.
    async fn assign_to(&mut self, worker_id: &WorkerId, task: Task, now: u64) -> Option<Task> {
        let task_id = task.id.clone();
        let Some(worker) = self.workers.get_mut(worker_id) else {
            return Some(task);
        };

        let mut task = task;
        task.mark_started(worker_id, now);
        match worker.assign_task(task.clone()).await {
            Ok(()) => {
                self.dispatch_retries.remove(&task_id);
                self.persist_task(&task).await;
                self.emit(OrchestratorEvent::TaskAssigned {
                    task_id,
                    worker_id: worker_id.clone(),
                });
                None
            }
            Err(err) => {
                tracing::warn!(
                    task_id = %task_id,
                    worker_id = %worker_id,
                    error = %err,
                    "assignment failed"
                );
                task.mark_requeued();
                Some(task)
            }
        }
    }

    /// Count a failed dispatch attempt; finalize the task when exhausted.
    async fn note_dispatch_failure(&mut self, task: &mut Task) {
        let attempt = self.bump_retries(task);
        if attempt >= MAX_DISPATCH_RETRIES {
            self.finalize_dispatch_failure(
                task,
                format!("dispatch failed after {} attempts", attempt),
            )
            .await;
        }
    }

    fn bump_retries(&mut self, task: &Task) -> u32 {
        let counter = self.dispatch_retries.entry(task.id.clone()).or_insert(0);
        *counter += 1;
        *counter
    }

    async fn finalize_dispatch_failure(&mut self, task: &mut Task, reason: String) {
        task.mark_failed(reason.clone(), self.clock.epoch_ms());
        self.failed_tasks.insert(task.id.clone(), reason.clone());
        self.dispatch_retries.remove(&task.id);
        self.persist_task(task).await;
        self.emit(OrchestratorEvent::TaskFailed {
            task_id: task.id.clone(),
            reason,
        });
    }

    /// Worktree creation is best-effort; the task runs without one on
    /// failure.
    async fn attach_worktree(&mut self, task: &mut Task) {
        let result = self
            .deps
            .worktrees
            .create_worktree(
                task.id.as_str(),
                &self.config.worktree_dir,
                self.config.repo_root.as_deref(),
            )
            .await;
        match result {
            Ok(worktree) => {
                task.worktree_path = Some(worktree.path);
                task.worktree_branch = Some(worktree.branch);
            }
            Err(err) => {
                tracing::warn!(task_id = %task.id, error = %err, "worktree creation failed");
            }
        }
    }

    /// Create and start a fresh worker for `tool`.
    pub(crate) async fn create_worker(
        &mut self,
        tool: &str,
    ) -> Result<WorkerId, crate::OrchestratorError> {
        let id = WorkerId::new(worker_id(tool, &self.idgen));
        let mut worker = WorkerSession::new(
            id.clone(),
            tool,
            self.config.clone(),
            self.deps.mux.clone(),
            self.clock.clone(),
            self.config.repo_root.clone(),
        )?;
        worker.start().await?;

        tracing::info!(worker_id = %id, tool, "worker created");
        self.emit(OrchestratorEvent::WorkerCreated {
            worker_id: id.clone(),
            tool: tool.to_string(),
        });
        self.workers.insert(id.clone(), worker);
        Ok(id)
    }
}
