// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Spec runner: dependency waves over a task graph.
//!
//! A spec's tasks are topologically sorted into waves (Kahn-style); each
//! wave runs through a fresh orchestrator and must fully terminate before
//! the next wave launches. A failure inside a wave stops the run. Live
//! status is persisted to a launch-session JSON after every transition.

use crate::orchestrator::{Orchestrator, OrchestratorDeps};
use hive_adapters::multiplexer::MultiplexerAdapter;
use hive_adapters::store::TaskStore;
use hive_adapters::worktree::WorktreeAdapter;
use hive_adapters::EscalationAdapter;
use hive_core::{Clock, OrchestratorConfig, Task, TaskId};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors from spec validation and wave computation
#[derive(Debug, Error)]
pub enum SpecError {
    #[error("duplicate task id in spec: {0}")]
    DuplicateTask(String),
    #[error("dependency cycle among tasks: {}", .0.join(", "))]
    DependencyCycle(Vec<String>),
}

/// A task graph submitted by a caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Spec {
    pub name: String,
    #[serde(default)]
    pub goal: String,
    pub tasks: Vec<SpecTask>,
}

/// One node in the task graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpecTask {
    pub id: String,
    pub prompt: String,
    #[serde(default)]
    pub agent: Option<String>,
    #[serde(default)]
    pub depends_on: Vec<String>,
}

/// Status of a run, wave, or task in the launch-session file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Pending => write!(f, "pending"),
            RunStatus::Running => write!(f, "running"),
            RunStatus::Completed => write!(f, "completed"),
            RunStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Outcome of one wave.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaveResult {
    pub number: usize,
    pub completed: Vec<String>,
    pub failed: Vec<String>,
}

/// Outcome of a whole spec run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecRunResult {
    pub status: RunStatus,
    pub waves: Vec<WaveResult>,
}

/// Knobs for `run_spec`.
pub struct SpecRunOptions {
    pub config: OrchestratorConfig,
    /// Directory receiving the launch-session file; no file when absent
    pub session_dir: Option<PathBuf>,
    /// Tool for tasks that don't name one
    pub default_agent: String,
    /// Wave-barrier poll interval
    pub wave_poll_ms: u64,
    /// Barrier cap: polls per wave before the wave is abandoned (~2h at 2s)
    pub max_wave_polls: u64,
    /// Session-state snapshot override passed to each wave's orchestrator
    pub state_path: Option<PathBuf>,
}

impl Default for SpecRunOptions {
    fn default() -> Self {
        Self {
            config: OrchestratorConfig::default(),
            session_dir: None,
            default_agent: "claude".to_string(),
            wave_poll_ms: 2_000,
            max_wave_polls: 3_600,
            state_path: None,
        }
    }
}

// Launch-session file schema

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LaunchTask {
    spec_id: String,
    internal_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    agent: Option<String>,
    status: RunStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LaunchWave {
    number: usize,
    status: RunStatus,
    tasks: Vec<LaunchTask>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LaunchSession {
    spec_name: String,
    started_at_ms: u64,
    total_waves: usize,
    current_wave: usize,
    status: RunStatus,
    waves: Vec<LaunchWave>,
}

/// Kahn-style wave computation.
///
/// Each wave is the set of remaining tasks whose dependencies have all
/// completed in earlier waves. Dependencies that name no task in the spec
/// are warned about and treated as satisfied; an iteration that frees no
/// task means a cycle, reported with every remaining ID.
pub fn compute_waves(tasks: &[SpecTask]) -> Result<Vec<Vec<String>>, SpecError> {
    let mut known: HashSet<&str> = HashSet::new();
    for task in tasks {
        if !known.insert(task.id.as_str()) {
            return Err(SpecError::DuplicateTask(task.id.clone()));
        }
    }
    for task in tasks {
        for dep in &task.depends_on {
            if !known.contains(dep.as_str()) {
                tracing::warn!(task_id = %task.id, dep = %dep, "dependency not in spec, treating as satisfied");
            }
        }
    }

    let mut remaining: Vec<&SpecTask> = tasks.iter().collect();
    let mut done: HashSet<&str> = HashSet::new();
    let mut waves: Vec<Vec<String>> = Vec::new();

    while !remaining.is_empty() {
        let (ready, blocked): (Vec<&SpecTask>, Vec<&SpecTask>) =
            remaining.iter().partition(|task| {
                task.depends_on
                    .iter()
                    .all(|dep| done.contains(dep.as_str()) || !known.contains(dep.as_str()))
            });

        if ready.is_empty() {
            let mut cyclic: Vec<String> = blocked.iter().map(|t| t.id.clone()).collect();
            cyclic.sort();
            return Err(SpecError::DependencyCycle(cyclic));
        }

        for task in &ready {
            done.insert(task.id.as_str());
        }
        waves.push(ready.iter().map(|t| t.id.clone()).collect());
        remaining = blocked;
    }

    Ok(waves)
}

/// Lowercase alphanumeric-and-dash slug for IDs and filenames.
fn slug(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            'a'..='z' | '0'..='9' | '-' => out.push(c),
            'A'..='Z' => out.push(c.to_ascii_lowercase()),
            _ => out.push('-'),
        }
    }
    out.split('-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

/// Run a spec through the engine, wave by wave.
///
/// Each wave gets a fresh orchestrator; spec-level dependencies become
/// affinity hints. The run stops launching waves after the first wave with
/// a failed task, and every orchestrator is shut down before returning.
pub async fn run_spec<M, E, W, S, C>(
    spec: &Spec,
    deps: OrchestratorDeps<M, E, W, S>,
    clock: C,
    options: SpecRunOptions,
) -> Result<SpecRunResult, SpecError>
where
    M: MultiplexerAdapter,
    E: EscalationAdapter,
    W: WorktreeAdapter,
    S: TaskStore,
    C: Clock,
{
    let waves = compute_waves(&spec.tasks)?;
    let spec_slug = slug(&spec.name);
    let by_id: HashMap<&str, &SpecTask> =
        spec.tasks.iter().map(|task| (task.id.as_str(), task)).collect();
    let wave_of: HashMap<&str, usize> = waves
        .iter()
        .enumerate()
        .flat_map(|(index, wave)| wave.iter().map(move |id| (id.as_str(), index + 1)))
        .collect();
    let internal_id =
        |wave_no: usize, spec_id: &str| format!("{}-w{}-{}", spec_slug, wave_no, spec_id);

    let mut session = LaunchSession {
        spec_name: spec.name.clone(),
        started_at_ms: clock.epoch_ms(),
        total_waves: waves.len(),
        current_wave: 0,
        status: RunStatus::Running,
        waves: waves
            .iter()
            .enumerate()
            .map(|(index, wave)| LaunchWave {
                number: index + 1,
                status: RunStatus::Pending,
                tasks: wave
                    .iter()
                    .map(|spec_id| LaunchTask {
                        spec_id: spec_id.clone(),
                        internal_id: internal_id(index + 1, spec_id),
                        agent: by_id
                            .get(spec_id.as_str())
                            .and_then(|task| task.agent.clone()),
                        status: RunStatus::Pending,
                    })
                    .collect(),
            })
            .collect(),
    };
    let session_path = options
        .session_dir
        .as_ref()
        .map(|dir| dir.join(format!("{}-session.json", spec_slug)));
    write_session(&session_path, &session).await;

    let mut results: Vec<WaveResult> = Vec::new();
    let mut overall = RunStatus::Completed;

    for (index, wave) in waves.iter().enumerate() {
        let wave_no = index + 1;
        tracing::info!(spec = %spec.name, wave = wave_no, tasks = wave.len(), "launching wave");

        session.current_wave = wave_no;
        session.waves[index].status = RunStatus::Running;
        for task in &mut session.waves[index].tasks {
            task.status = RunStatus::Running;
        }
        write_session(&session_path, &session).await;

        let mut orchestrator =
            Orchestrator::new(deps.clone(), clock.clone(), options.config.clone());
        if let Some(path) = &options.state_path {
            orchestrator.set_state_path(path.clone());
        }

        let mut wave_ids: Vec<TaskId> = Vec::new();
        for spec_id in wave {
            let Some(spec_task) = by_id.get(spec_id.as_str()) else {
                continue;
            };
            let id = TaskId::new(internal_id(wave_no, spec_id));
            let agent = spec_task
                .agent
                .clone()
                .unwrap_or_else(|| options.default_agent.clone());
            let task = Task::new(id.clone(), agent, spec_task.prompt.clone(), clock.epoch_ms())
                .with_depends_on(
                    spec_task
                        .depends_on
                        .iter()
                        // Hints point at the dependency's own wave's internal ID
                        .filter_map(|dep| {
                            wave_of
                                .get(dep.as_str())
                                .map(|dep_wave| TaskId::new(internal_id(*dep_wave, dep)))
                        })
                        .collect(),
                );
            wave_ids.push(id);
            orchestrator.queue_task(task).await;
        }

        // Wave barrier: tick until every task terminates or the cap trips
        let mut polls: u64 = 0;
        loop {
            orchestrator.tick().await;
            let all_terminal = wave_ids
                .iter()
                .all(|id| orchestrator.is_task_completed(id) || orchestrator.is_task_failed(id));
            if all_terminal {
                break;
            }
            polls += 1;
            if polls >= options.max_wave_polls {
                tracing::error!(spec = %spec.name, wave = wave_no, "wave barrier cap reached");
                break;
            }
            tokio::time::sleep(Duration::from_millis(options.wave_poll_ms)).await;
        }

        let mut result = WaveResult {
            number: wave_no,
            completed: Vec::new(),
            failed: Vec::new(),
        };
        for (spec_id, id) in wave.iter().zip(&wave_ids) {
            if orchestrator.is_task_completed(id) {
                result.completed.push(spec_id.clone());
            } else {
                result.failed.push(spec_id.clone());
            }
        }

        orchestrator.shutdown().await;

        let wave_failed = !result.failed.is_empty();
        session.waves[index].status = if wave_failed {
            RunStatus::Failed
        } else {
            RunStatus::Completed
        };
        for task in &mut session.waves[index].tasks {
            task.status = if result.completed.contains(&task.spec_id) {
                RunStatus::Completed
            } else {
                RunStatus::Failed
            };
        }
        results.push(result);

        if wave_failed {
            overall = RunStatus::Failed;
            session.status = RunStatus::Failed;
            write_session(&session_path, &session).await;
            tracing::warn!(spec = %spec.name, wave = wave_no, "wave failed, stopping run");
            break;
        }
        write_session(&session_path, &session).await;
    }

    session.status = overall;
    write_session(&session_path, &session).await;

    Ok(SpecRunResult {
        status: overall,
        waves: results,
    })
}

/// Best-effort launch-session persistence.
async fn write_session(path: &Option<PathBuf>, session: &LaunchSession) {
    let Some(path) = path else {
        return;
    };
    let write = async {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_vec_pretty(session).map_err(std::io::Error::other)?;
        tokio::fs::write(path, json).await
    };
    if let Err(err) = write.await {
        tracing::warn!(path = %path.display(), error = %err, "launch session write failed");
    }
}

#[cfg(test)]
#[path = "spec_runner_tests.rs"]
mod tests;
