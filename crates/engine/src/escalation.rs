// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tier-2 LLM escalation.
//!
//! Builds the supervisor prompt, invokes the headless escalation adapter,
//! and parses the reply: a first-line meta-command from a closed set, or
//! literal text typed into the worker's TUI. Invocation failures and
//! timeouts degrade to WAIT so one flaky escalation can't wedge a worker.

use hive_adapters::EscalationAdapter;
use hive_core::{
    OrchestratorAction, OrchestratorConfig, StateSnapshot, TaskAssignment, WorkerInfo, WorkerState,
};
use std::time::{Duration, Instant};

/// Wait applied when the LLM answers WAIT (or didn't answer at all).
pub const ESCALATION_WAIT_MS: u64 = 30_000;

/// Maximum output lines embedded in a prompt before truncation.
const FIX_PROMPT_MAX_LINES: usize = 500;

/// Parsed LLM reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LlmReply {
    Approve,
    Wait,
    Restart,
    Done,
    Failed,
    /// Anything that isn't a meta-command is typed into the TUI verbatim
    Text(String),
}

/// Result of one escalation round-trip.
#[derive(Debug, Clone, PartialEq)]
pub struct EscalationOutcome {
    pub raw_response: String,
    pub parsed: LlmReply,
    pub action: OrchestratorAction,
    pub duration_ms: u64,
}

/// Parse a raw LLM response.
///
/// The first non-blank line, upper-cased and trimmed, is checked against the
/// closed meta-command set; anything else is literal text. Empty input parses
/// to WAIT.
pub fn parse_reply(raw: &str) -> LlmReply {
    let Some(first) = raw.lines().map(str::trim).find(|line| !line.is_empty()) else {
        return LlmReply::Wait;
    };
    match first.to_uppercase().as_str() {
        "APPROVE" => LlmReply::Approve,
        "WAIT" => LlmReply::Wait,
        "RESTART" => LlmReply::Restart,
        "DONE" => LlmReply::Done,
        "FAILED" => LlmReply::Failed,
        _ => LlmReply::Text(raw.to_string()),
    }
}

/// Map a parsed reply to an executable action.
pub fn reply_to_action(reply: &LlmReply, state: WorkerState) -> OrchestratorAction {
    match reply {
        LlmReply::Approve => OrchestratorAction::Approve,
        LlmReply::Wait => OrchestratorAction::Wait {
            ms: ESCALATION_WAIT_MS,
        },
        LlmReply::Restart => OrchestratorAction::Restart,
        LlmReply::Done => OrchestratorAction::MarkComplete,
        LlmReply::Failed => OrchestratorAction::MarkFailed {
            reason: state.to_string(),
        },
        LlmReply::Text(text) => OrchestratorAction::SendText { text: text.clone() },
    }
}

/// Embed agent output in a prompt, truncated to the last 500 lines.
///
/// Lossless when the output fits; otherwise the omitted-line count is
/// embedded so the reader knows context is missing. `note` is appended
/// verbatim when non-empty.
pub fn build_fix_prompt(output: &str, note: &str) -> String {
    let lines: Vec<&str> = output.lines().collect();
    let body = if lines.len() > FIX_PROMPT_MAX_LINES {
        let omitted = lines.len() - FIX_PROMPT_MAX_LINES;
        format!(
            "(... {} earlier lines omitted)\n{}",
            omitted,
            lines[omitted..].join("\n")
        )
    } else {
        output.to_string()
    };
    if note.is_empty() {
        body
    } else {
        format!("{}\n{}", body, note)
    }
}

// Situation hints supplied by Tier-1 rules. Each explains the state in one
// or two human sentences; the full prompt wraps them with task and output
// context.

pub(crate) fn approval_hint(snapshot: &StateSnapshot) -> String {
    format!(
        "The agent is showing an approval dialog and will not continue until \
         it is answered. Matched pattern: {}.",
        snapshot.matched_pattern
    )
}

pub(crate) fn input_hint(task_prompt: &str, recent: &str) -> String {
    format!(
        "The agent asked a question and is blocked waiting for input.\n\
         Its task was:\n{}\n\nThe question, from its recent output:\n{}",
        task_prompt, recent
    )
}

pub(crate) fn stuck_hint(measured: &str) -> String {
    format!(
        "The agent claims to be working but its output has not changed \
         ({}). Give it guidance to continue, or answer RESTART to start it \
         over, or FAILED to give up on the task.",
        measured
    )
}

pub(crate) fn error_hint() -> String {
    "The agent is showing an error banner. Decide whether to recover with \
     instructions, RESTART it, or mark the task FAILED."
        .to_string()
}

/// Assemble the full supervisor prompt.
pub fn build_escalation_prompt(
    hint: &str,
    snapshot: &StateSnapshot,
    worker: &WorkerInfo,
    assignment: Option<&TaskAssignment>,
    recent_output: &str,
) -> String {
    let mut prompt = String::new();
    prompt.push_str(
        "You are the supervisor of an automated coding agent running in a terminal.\n\n",
    );
    prompt.push_str(&format!(
        "## Situation\nWorker {} ({}) is in state `{}`.\n{}\n",
        worker.id, worker.tool, snapshot.state, hint
    ));
    if let Some(assignment) = assignment {
        prompt.push_str(&format!(
            "\n## Current task\n{}\n",
            assignment.task.prompt
        ));
    }
    prompt.push_str(&format!(
        "\n## Recent terminal output\n```\n{}\n```\n",
        build_fix_prompt(recent_output, "")
    ));
    prompt.push_str(
        "\n## How to respond\n\
         Reply with exactly one of these meta-commands as your first line:\n\
         - APPROVE: confirm the agent's pending dialog\n\
         - WAIT: do nothing, check again shortly\n\
         - RESTART: restart the agent (its conversation is lost)\n\
         - DONE: mark the current task complete\n\
         - FAILED: mark the current task failed\n\
         Any other response is typed into the agent's terminal verbatim.\n",
    );
    prompt
}

/// Invoke the escalation tool and map its reply to an action.
///
/// Never errors: adapter failures and timeouts are logged and parsed as an
/// empty reply, which maps to WAIT.
pub async fn resolve_escalation<E: EscalationAdapter>(
    escalation: &E,
    config: &OrchestratorConfig,
    prompt: &str,
    state: WorkerState,
) -> EscalationOutcome {
    let started = Instant::now();
    let raw_response = match escalation
        .invoke(
            &config.llm_escalation_tool,
            prompt,
            Duration::from_millis(config.llm_escalation_timeout_ms),
        )
        .await
    {
        Ok(text) => text,
        Err(err) => {
            tracing::warn!(
                tool = %config.llm_escalation_tool,
                error = %err,
                "escalation failed; treating as WAIT"
            );
            String::new()
        }
    };

    let parsed = parse_reply(&raw_response);
    let action = reply_to_action(&parsed, state);
    EscalationOutcome {
        raw_response,
        parsed,
        action,
        duration_ms: started.elapsed().as_millis() as u64,
    }
}

#[cfg(test)]
#[path = "escalation_tests.rs"]
mod tests;
