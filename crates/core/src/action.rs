// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Actions the orchestrator can take against a worker.
//!
//! Actions are produced by the response engine (Tier 1 rules or a Tier 2
//! LLM escalation) and executed by the orchestrator's tick. The set is
//! closed; executors match exhaustively.

use serde::{Deserialize, Serialize};

/// One decided action against a single worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrchestratorAction {
    /// Leave the worker alone this tick
    Noop,

    /// Send raw key tokens (named keys like `Enter`, `Escape`, `C-c` allowed)
    SendKeys { keys: Vec<String> },

    /// Type text literally into the TUI, then submit
    SendText { text: String },

    /// Confirm the TUI's pending dialog (Enter)
    Approve,

    /// Send the tool's dismiss key (startup dialogs, menus)
    Dismiss,

    /// Postpone the worker's next monitoring visit
    Wait { ms: u64 },

    /// Tear the worker down and start a fresh TUI (conversation is lost)
    Restart,

    /// Hand the situation to the headless LLM decider
    EscalateLlm { prompt: String },

    /// Record the current assignment as completed
    MarkComplete,

    /// Record the current assignment as failed
    MarkFailed { reason: String },
}

impl OrchestratorAction {
    /// Action name for log spans (e.g., "send_text", "mark_failed")
    pub fn name(&self) -> &'static str {
        match self {
            OrchestratorAction::Noop => "noop",
            OrchestratorAction::SendKeys { .. } => "send_keys",
            OrchestratorAction::SendText { .. } => "send_text",
            OrchestratorAction::Approve => "approve",
            OrchestratorAction::Dismiss => "dismiss",
            OrchestratorAction::Wait { .. } => "wait",
            OrchestratorAction::Restart => "restart",
            OrchestratorAction::EscalateLlm { .. } => "escalate_llm",
            OrchestratorAction::MarkComplete => "mark_complete",
            OrchestratorAction::MarkFailed { .. } => "mark_failed",
        }
    }

    /// Key-value pairs for structured logging
    pub fn fields(&self) -> Vec<(&'static str, String)> {
        match self {
            OrchestratorAction::Noop
            | OrchestratorAction::Approve
            | OrchestratorAction::Dismiss
            | OrchestratorAction::Restart
            | OrchestratorAction::MarkComplete => Vec::new(),
            OrchestratorAction::SendKeys { keys } => {
                vec![("keys", keys.join(" "))]
            }
            OrchestratorAction::SendText { text } => {
                vec![("text_len", text.len().to_string())]
            }
            OrchestratorAction::Wait { ms } => vec![("wait_ms", ms.to_string())],
            OrchestratorAction::EscalateLlm { prompt } => {
                vec![("prompt_len", prompt.len().to_string())]
            }
            OrchestratorAction::MarkFailed { reason } => vec![("reason", reason.clone())],
        }
    }
}

#[cfg(test)]
#[path = "action_tests.rs"]
mod tests;
