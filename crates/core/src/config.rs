// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Orchestrator configuration.
//!
//! Every field has a serde default so embedders can supply partial TOML.
//! `validate` rejects values the control loop cannot run with.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Errors from loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config value: {0}")]
    Invalid(String),
}

/// Outcome of a granular approval-policy lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionDecision {
    /// Approve the dialog programmatically
    Allow,
    /// Fail the task with a denial reason
    Deny,
    /// Escalate to the LLM decider
    Ask,
}

impl Default for PermissionDecision {
    fn default() -> Self {
        PermissionDecision::Ask
    }
}

/// Granular policy for approval dialogs, by category of requested action.
///
/// `denied_commands` / `allowed_commands` are regexes matched against the
/// dialog text before the category decision applies; deny wins over allow.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalPolicy {
    #[serde(default)]
    pub file_write: PermissionDecision,
    #[serde(default)]
    pub shell_exec: PermissionDecision,
    #[serde(default)]
    pub network: PermissionDecision,
    #[serde(default)]
    pub package_install: PermissionDecision,
    #[serde(default)]
    pub denied_commands: Vec<String>,
    #[serde(default)]
    pub allowed_commands: Vec<String>,
}

/// Tuning knobs for the orchestration engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    pub enabled: bool,
    /// Upper bound on concurrently live workers
    pub max_workers: usize,
    pub tick_interval_ms: u64,
    /// Legacy blanket approval; superseded by `approval_policy` when set
    pub auto_approve: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approval_policy: Option<ApprovalPolicy>,
    /// Working-with-no-output-change duration that flips a worker to stuck
    pub stuck_timeout_ms: u64,
    /// Tool invoked headlessly for Tier-2 escalations
    pub llm_escalation_tool: String,
    /// Lines of recent pane output included in escalation prompts
    pub llm_context_lines: usize,
    /// Dwell time before an assigned worker's idle counts as completion
    pub idle_settling_ms: u64,
    /// Recycle a worker after this many completions (0 = unbounded)
    pub max_tasks_per_worker: u32,
    pub use_worktrees: bool,
    pub worktree_dir: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repo_root: Option<PathBuf>,
    /// Wall-clock limit per task (0 = unlimited)
    pub task_timeout_ms: u64,
    pub llm_escalation_timeout_ms: u64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_workers: 3,
            tick_interval_ms: 2_000,
            auto_approve: false,
            approval_policy: None,
            stuck_timeout_ms: 120_000,
            llm_escalation_tool: "claude".to_string(),
            llm_context_lines: 50,
            idle_settling_ms: 5_000,
            max_tasks_per_worker: 0,
            use_worktrees: false,
            worktree_dir: PathBuf::from(".openhive/worktrees"),
            repo_root: None,
            task_timeout_ms: 0,
            llm_escalation_timeout_ms: 60_000,
        }
    }
}

impl OrchestratorConfig {
    /// Parse a config from TOML, applying defaults for missing fields.
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the control loop cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_workers == 0 {
            return Err(ConfigError::Invalid("max_workers must be at least 1".into()));
        }
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "tick_interval_ms must be non-zero".into(),
            ));
        }
        if self.llm_escalation_tool.is_empty() {
            return Err(ConfigError::Invalid(
                "llm_escalation_tool must not be empty".into(),
            ));
        }
        if self.llm_escalation_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "llm_escalation_timeout_ms must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
