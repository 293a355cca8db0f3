// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-worker monitoring: wall-clock deadlines, cheap output probes, state
//! classification, and Tier-1 decisions.

use super::Orchestrator;
use crate::decision::{ResponseEngine, RuleCtx};
use crate::worker::WorkerSession;
use hive_adapters::multiplexer::MultiplexerAdapter;
use hive_adapters::store::TaskStore;
use hive_adapters::worktree::WorktreeAdapter;
use hive_adapters::EscalationAdapter;
use hive_core::{Clock, OrchestratorAction, OrchestratorEvent, WorkerState};

/// Minimum interval between full pane classifications when the pipe is
/// quiet.
pub(crate) const MONITOR_DEBOUNCE_MS: u64 = 5_000;

/// Provider-wide cooldown installed when a worker reports a rate limit.
pub(crate) const RATE_LIMIT_COOLDOWN_MS: u64 = 60_000;

impl<M, E, W, S, C> Orchestrator<M, E, W, S, C>
where
    M: MultiplexerAdapter,
    E: EscalationAdapter,
    W: WorktreeAdapter,
    S: TaskStore,
    C: Clock,
{
    pub(crate) async fn monitor_workers(&mut self) {
        for id in self.worker_visit_order() {
            // Taken out of the map so monitoring can borrow the pool state
            let Some(mut worker) = self.workers.remove(&id) else {
                continue;
            };
            let keep = self.monitor_one(&mut worker).await;
            if keep {
                self.workers.insert(id, worker);
            } else {
                let requeued = worker.take_assignment().map(|mut task| {
                    task.mark_requeued();
                    let task_id = task.id.clone();
                    self.pending.push(task);
                    task_id
                });
                self.emit(OrchestratorEvent::WorkerDied {
                    worker_id: id,
                    requeued_task: requeued,
                });
            }
        }
    }

    /// Visit one worker. Returns false when the worker must leave the pool
    /// (failed restart).
    async fn monitor_one(&mut self, worker: &mut WorkerSession<M, C>) -> bool {
        let now = self.clock.epoch_ms();

        // The reap pass owns dead workers
        if worker.state() == WorkerState::Dead {
            return true;
        }

        // Wall-clock deadline comes before any other per-tick work
        if self.config.task_timeout_ms > 0 {
            if let Some(assignment) = worker.assignment() {
                let elapsed = now.saturating_sub(assignment.assigned_at_ms);
                if elapsed > self.config.task_timeout_ms {
                    let action = OrchestratorAction::MarkFailed {
                        reason: format!(
                            "task timed out after {}ms (limit {}ms)",
                            elapsed, self.config.task_timeout_ms
                        ),
                    };
                    self.emit(OrchestratorEvent::ActionTaken {
                        worker_id: worker.id().clone(),
                        action: action.clone(),
                    });
                    return self.execute_action(worker, action, None).await;
                }
            }
        }

        // Cheap probe first; quiet workers are revisited on a debounce
        let fresh_output = worker.has_new_output().await;
        if !fresh_output && now < worker.last_check_at_ms().saturating_add(MONITOR_DEBOUNCE_MS) {
            return true;
        }

        let snapshot = match worker.detect_state().await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                tracing::warn!(worker_id = %worker.id(), error = %err, "state detection failed");
                return true;
            }
        };

        let previous = worker.state();
        if snapshot.state != previous {
            worker.set_state(snapshot.state);
            worker.mirror_state_to_task(snapshot.state);
            self.emit(OrchestratorEvent::StateChanged {
                worker_id: worker.id().clone(),
                from: previous,
                to: snapshot.state,
            });
            if snapshot.state == WorkerState::RateLimited {
                self.provider_cooldowns
                    .insert(worker.tool().to_string(), now + RATE_LIMIT_COOLDOWN_MS);
                tracing::warn!(tool = %worker.tool(), "provider cooldown installed");
            }
        }

        let action = {
            let config = self.config.clone();
            let engine = self
                .response_engines
                .entry(worker.tool().to_string())
                .or_insert_with(ResponseEngine::new);
            let info = worker.info();
            engine.decide(&RuleCtx {
                snapshot: &snapshot,
                worker: &info,
                assignment: info.assignment.as_ref(),
                config: &config,
                now_ms: now,
            })
        };

        if action != OrchestratorAction::Noop {
            self.emit(OrchestratorEvent::ActionTaken {
                worker_id: worker.id().clone(),
                action: action.clone(),
            });
        }

        self.execute_action(worker, action, Some(&snapshot)).await
    }
}
