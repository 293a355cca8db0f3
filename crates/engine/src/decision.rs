// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tier-1 programmatic decisions.
//!
//! A priority-ordered rule table maps (state, context) to an action. Rules
//! are plain data; the first applicable rule wins. Ties are broken by
//! registration order (the sort is stable), which is load-bearing for the
//! two idle rules: `idle_complete` must be consulted before `idle_noop`.

use crate::escalation;
use hive_adapters::text::trailing_nonblank;
use hive_core::{
    ApprovalPolicy, OrchestratorAction, OrchestratorConfig, PermissionDecision, StateSnapshot,
    TaskAssignment, WorkerInfo, WorkerState,
};
use regex::Regex;
use std::sync::LazyLock;

/// Flat wait applied when a provider reports a rate limit.
pub const RATE_LIMIT_WAIT_MS: u64 = 60_000;

/// Lines of pane text quoted in denial reasons.
const DENIAL_CONTEXT_LINES: usize = 10;

/// Lines of pane text handed to input/stuck escalation hints.
const ESCALATION_CONTEXT_LINES: usize = 30;

/// Context handed to rules.
pub struct RuleCtx<'a> {
    pub snapshot: &'a StateSnapshot,
    pub worker: &'a WorkerInfo,
    pub assignment: Option<&'a TaskAssignment>,
    pub config: &'a OrchestratorConfig,
    pub now_ms: u64,
}

/// One programmatic rule.
///
/// `build` returning `None` means the rule's predicate did not hold and the
/// next rule is consulted.
pub struct ActionRule {
    pub name: &'static str,
    pub states: &'static [WorkerState],
    /// Higher wins; ties resolved by registration order
    pub priority: i32,
    pub build: fn(&RuleCtx) -> Option<OrchestratorAction>,
}

/// Tier-1 decision engine: priority-ordered rules, first match fires.
pub struct ResponseEngine {
    rules: Vec<ActionRule>,
}

impl Default for ResponseEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseEngine {
    pub fn new() -> Self {
        Self::with_rules(default_rules())
    }

    pub fn with_rules(mut rules: Vec<ActionRule>) -> Self {
        // Stable: registration order is the explicit tie-breaker
        rules.sort_by_key(|rule| std::cmp::Reverse(rule.priority));
        Self { rules }
    }

    /// Decide the action for the current observation. No applicable rule
    /// means leave the worker alone.
    pub fn decide(&self, ctx: &RuleCtx) -> OrchestratorAction {
        for rule in &self.rules {
            if !rule.states.contains(&ctx.snapshot.state) {
                continue;
            }
            if let Some(action) = (rule.build)(ctx) {
                tracing::debug!(
                    rule = rule.name,
                    worker_id = %ctx.worker.id,
                    action = action.name(),
                    "tier-1 rule fired"
                );
                return action;
            }
        }
        OrchestratorAction::Noop
    }
}

/// The default rule set.
pub fn default_rules() -> Vec<ActionRule> {
    vec![
        ActionRule {
            name: "approval_policy",
            states: &[WorkerState::WaitingApproval],
            priority: 100,
            build: |ctx| {
                let policy = ctx.config.approval_policy.as_ref()?;
                Some(match evaluate_policy(policy, &ctx.snapshot.pane_text) {
                    PermissionDecision::Allow => OrchestratorAction::Approve,
                    PermissionDecision::Deny => OrchestratorAction::MarkFailed {
                        reason: format!(
                            "approval denied by policy:\n{}",
                            trailing_nonblank(&ctx.snapshot.pane_text, DENIAL_CONTEXT_LINES)
                        ),
                    },
                    PermissionDecision::Ask => OrchestratorAction::EscalateLlm {
                        prompt: escalation::approval_hint(ctx.snapshot),
                    },
                })
            },
        },
        ActionRule {
            name: "approval_auto",
            states: &[WorkerState::WaitingApproval],
            priority: 95,
            build: |ctx| ctx.config.auto_approve.then_some(OrchestratorAction::Approve),
        },
        ActionRule {
            name: "approval_escalate",
            states: &[WorkerState::WaitingApproval],
            priority: 90,
            build: |ctx| {
                Some(OrchestratorAction::EscalateLlm {
                    prompt: escalation::approval_hint(ctx.snapshot),
                })
            },
        },
        ActionRule {
            name: "startup_dismiss",
            states: &[WorkerState::Starting],
            priority: 85,
            build: |_| Some(OrchestratorAction::Dismiss),
        },
        ActionRule {
            name: "rate_limit_wait",
            states: &[WorkerState::RateLimited],
            priority: 80,
            build: |_| Some(OrchestratorAction::Wait { ms: RATE_LIMIT_WAIT_MS }),
        },
        ActionRule {
            name: "input_escalate",
            states: &[WorkerState::WaitingInput],
            priority: 75,
            build: |ctx| {
                let task_prompt = ctx.assignment.map(|a| a.task.prompt.as_str()).unwrap_or("");
                Some(OrchestratorAction::EscalateLlm {
                    prompt: escalation::input_hint(
                        task_prompt,
                        &trailing_nonblank(&ctx.snapshot.pane_text, ESCALATION_CONTEXT_LINES),
                    ),
                })
            },
        },
        ActionRule {
            name: "stuck_escalate",
            states: &[WorkerState::Stuck],
            priority: 70,
            build: |ctx| {
                Some(OrchestratorAction::EscalateLlm {
                    prompt: escalation::stuck_hint(&ctx.snapshot.matched_pattern),
                })
            },
        },
        ActionRule {
            name: "error_escalate",
            states: &[WorkerState::Error],
            priority: 65,
            build: |_| {
                Some(OrchestratorAction::EscalateLlm {
                    prompt: escalation::error_hint(),
                })
            },
        },
        ActionRule {
            name: "dead_restart",
            states: &[WorkerState::Dead],
            priority: 60,
            build: |_| Some(OrchestratorAction::Restart),
        },
        // Same priority as idle_noop on purpose; registration order decides.
        ActionRule {
            name: "idle_complete",
            states: &[WorkerState::Idle],
            priority: 50,
            build: |ctx| {
                let assignment = ctx.assignment?;
                assignment
                    .idle_settled(ctx.now_ms, ctx.config.idle_settling_ms)
                    .then_some(OrchestratorAction::MarkComplete)
            },
        },
        ActionRule {
            name: "idle_noop",
            states: &[WorkerState::Idle],
            priority: 50,
            build: |_| Some(OrchestratorAction::Noop),
        },
        ActionRule {
            name: "working_noop",
            states: &[WorkerState::Working],
            priority: 45,
            build: |_| Some(OrchestratorAction::Noop),
        },
    ]
}

/// Category of a pending approval dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalKind {
    FileWrite,
    ShellExec,
    Network,
    PackageInstall,
    Other,
}

#[allow(clippy::expect_used)]
static PACKAGE_INSTALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(npm install|npm i |pip install|cargo (add|install)|apt(-get)? install|brew install|yarn add)\b")
        .expect("constant regex pattern is valid")
});

#[allow(clippy::expect_used)]
static NETWORK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(curl|wget|fetch)\b|https?://").expect("constant regex pattern is valid")
});

#[allow(clippy::expect_used)]
static FILE_WRITE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(make this edit|write to|create file|overwrite|edit .*\.[a-z0-9]{1,8}\b)")
        .expect("constant regex pattern is valid")
});

#[allow(clippy::expect_used)]
static SHELL_EXEC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(bash command|shell command|run command|execute|allow command)")
        .expect("constant regex pattern is valid")
});

/// Classify the approval dialog in the trailing pane lines.
///
/// Package installs are checked before shell execution: they arrive as shell
/// commands but carry their own policy category.
pub fn classify_approval(text: &str) -> ApprovalKind {
    let window = trailing_nonblank(text, DENIAL_CONTEXT_LINES);
    if PACKAGE_INSTALL.is_match(&window) {
        ApprovalKind::PackageInstall
    } else if NETWORK.is_match(&window) {
        ApprovalKind::Network
    } else if FILE_WRITE.is_match(&window) {
        ApprovalKind::FileWrite
    } else if SHELL_EXEC.is_match(&window) {
        ApprovalKind::ShellExec
    } else {
        ApprovalKind::Other
    }
}

/// Evaluate the granular policy against the dialog text.
///
/// Denied-command regexes win over allowed-command regexes; both win over
/// the category decision. Invalid user regexes are skipped with a warning.
pub fn evaluate_policy(policy: &ApprovalPolicy, text: &str) -> PermissionDecision {
    let window = trailing_nonblank(text, DENIAL_CONTEXT_LINES);

    for pattern in &policy.denied_commands {
        match Regex::new(pattern) {
            Ok(regex) if regex.is_match(&window) => return PermissionDecision::Deny,
            Ok(_) => {}
            Err(err) => tracing::warn!(pattern, error = %err, "invalid denied_commands regex"),
        }
    }
    for pattern in &policy.allowed_commands {
        match Regex::new(pattern) {
            Ok(regex) if regex.is_match(&window) => return PermissionDecision::Allow,
            Ok(_) => {}
            Err(err) => tracing::warn!(pattern, error = %err, "invalid allowed_commands regex"),
        }
    }

    match classify_approval(text) {
        ApprovalKind::FileWrite => policy.file_write,
        ApprovalKind::ShellExec => policy.shell_exec,
        ApprovalKind::Network => policy.network,
        ApprovalKind::PackageInstall => policy.package_install,
        ApprovalKind::Other => PermissionDecision::Ask,
    }
}

#[cfg(test)]
#[path = "decision_tests.rs"]
mod tests;
