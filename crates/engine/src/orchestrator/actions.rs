// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Action execution and task bookkeeping.
//!
//! `execute_action` handles Tier-2 escalation by resolving it and feeding
//! the result through `execute_basic`, which treats a nested escalation as
//! a no-op: escalations never recurse.

use super::Orchestrator;
use crate::escalation::{build_escalation_prompt, resolve_escalation};
use crate::worker::WorkerSession;
use hive_adapters::multiplexer::MultiplexerAdapter;
use hive_adapters::store::TaskStore;
use hive_adapters::text::last_lines;
use hive_adapters::worktree::WorktreeAdapter;
use hive_adapters::EscalationAdapter;
use hive_core::{Clock, OrchestratorAction, OrchestratorEvent, StateSnapshot};

impl<M, E, W, S, C> Orchestrator<M, E, W, S, C>
where
    M: MultiplexerAdapter,
    E: EscalationAdapter,
    W: WorktreeAdapter,
    S: TaskStore,
    C: Clock,
{
    /// Execute one decided action. Returns false when the worker must be
    /// removed from the pool (failed restart).
    pub(crate) async fn execute_action(
        &mut self,
        worker: &mut WorkerSession<M, C>,
        action: OrchestratorAction,
        snapshot: Option<&StateSnapshot>,
    ) -> bool {
        match action {
            OrchestratorAction::EscalateLlm { prompt: hint } => {
                let Some(snapshot) = snapshot else {
                    tracing::warn!(worker_id = %worker.id(), "escalation without snapshot context");
                    return true;
                };

                let recent = self
                    .deps
                    .mux
                    .read_pipe_tail(worker.pipe_file(), self.config.llm_context_lines)
                    .await;
                let recent = if recent.is_empty() {
                    last_lines(&snapshot.pane_text, self.config.llm_context_lines).join("\n")
                } else {
                    recent
                };

                let info = worker.info();
                let prompt = build_escalation_prompt(
                    &hint,
                    snapshot,
                    &info,
                    info.assignment.as_ref(),
                    &recent,
                );
                let outcome = resolve_escalation(
                    &self.deps.escalation,
                    &self.config,
                    &prompt,
                    snapshot.state,
                )
                .await;

                self.emit(OrchestratorEvent::LlmEscalation {
                    worker_id: worker.id().clone(),
                    raw_response: outcome.raw_response.clone(),
                    action: outcome.action.clone(),
                    duration_ms: outcome.duration_ms,
                });

                // The worker may have died while the LLM was thinking; a
                // resolved action against a dead window is dropped and the
                // reap pass takes over.
                if !worker.is_alive().await {
                    tracing::warn!(
                        worker_id = %worker.id(),
                        action = outcome.action.name(),
                        "worker died during escalation, dropping action"
                    );
                    return true;
                }

                self.execute_basic(worker, outcome.action).await
            }
            other => self.execute_basic(worker, other).await,
        }
    }

    async fn execute_basic(
        &mut self,
        worker: &mut WorkerSession<M, C>,
        action: OrchestratorAction,
    ) -> bool {
        match action {
            OrchestratorAction::Noop => true,

            OrchestratorAction::SendKeys { keys } => {
                if let Err(err) = worker.send_keys_to_agent(&keys).await {
                    tracing::warn!(worker_id = %worker.id(), error = %err, "send_keys failed");
                }
                true
            }

            OrchestratorAction::SendText { text } => {
                if let Err(err) = worker.send_text_to_agent(&text).await {
                    tracing::warn!(worker_id = %worker.id(), error = %err, "send_text failed");
                }
                true
            }

            OrchestratorAction::Approve => {
                if let Err(err) = worker.approve().await {
                    tracing::warn!(worker_id = %worker.id(), error = %err, "approve failed");
                }
                true
            }

            OrchestratorAction::Dismiss => {
                if let Err(err) = worker.dismiss().await {
                    tracing::warn!(worker_id = %worker.id(), error = %err, "dismiss failed");
                }
                true
            }

            // Never blocks the loop: the worker is postponed instead
            OrchestratorAction::Wait { ms } => {
                let until = self.clock.epoch_ms() + ms;
                worker.postpone_until(until);
                true
            }

            OrchestratorAction::Restart => self.restart_worker(worker).await,

            OrchestratorAction::MarkComplete => {
                self.complete_assignment(worker).await;
                // Recycling bounds a worker's conversation growth
                if worker.due_for_recycle(self.config.max_tasks_per_worker) {
                    tracing::info!(
                        worker_id = %worker.id(),
                        completed = worker.tasks_completed(),
                        "recycling worker"
                    );
                    return self.restart_worker(worker).await;
                }
                true
            }

            OrchestratorAction::MarkFailed { reason } => {
                self.fail_assignment(worker, reason).await;
                true
            }

            // Escalations never recurse
            OrchestratorAction::EscalateLlm { .. } => {
                tracing::warn!(
                    worker_id = %worker.id(),
                    "escalation resolved to another escalation, ignoring"
                );
                true
            }
        }
    }

    async fn restart_worker(&mut self, worker: &mut WorkerSession<M, C>) -> bool {
        match worker.restart().await {
            Ok(()) => {
                self.emit(OrchestratorEvent::WorkerRestarted {
                    worker_id: worker.id().clone(),
                });
                true
            }
            Err(err) => {
                tracing::error!(worker_id = %worker.id(), error = %err, "restart failed");
                worker.stop().await;
                // Caller removes the worker and requeues its assignment
                false
            }
        }
    }

    async fn complete_assignment(&mut self, worker: &mut WorkerSession<M, C>) {
        let Some(mut task) = worker.mark_task_complete() else {
            return;
        };
        let now = self.clock.epoch_ms();
        task.mark_completed(now);
        self.completed_task_ids.insert(task.id.clone());
        self.task_worker_affinity
            .insert(task.id.clone(), worker.id().clone());
        self.persist_task(&task).await;
        self.emit(OrchestratorEvent::TaskCompleted {
            task_id: task.id.clone(),
            worker_id: worker.id().clone(),
        });
    }

    async fn fail_assignment(&mut self, worker: &mut WorkerSession<M, C>, reason: String) {
        let Some(mut task) = worker.mark_task_failed() else {
            return;
        };
        let now = self.clock.epoch_ms();
        task.mark_failed(reason.clone(), now);
        self.failed_tasks.insert(task.id.clone(), reason.clone());
        self.persist_task(&task).await;
        self.emit(OrchestratorEvent::TaskFailed {
            task_id: task.id.clone(),
            reason,
        });
    }
}
