// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tool orchestration profiles.
//!
//! Tool differences are static data, not subclasses: each supported CLI gets
//! one record of start command, readiness markers, state patterns with
//! priorities, and key sequences. Adding a tool means adding one entry to
//! [`build_profiles`].
//!
//! Patterns are authored against each tool's interactive TUI. They match a
//! trailing window of non-blank pane lines, so wording changes in scrolled-off
//! history can't flip a worker's state.

use hive_core::WorkerState;
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;
use thiserror::Error;

/// Errors from profile lookup
#[derive(Debug, Error)]
pub enum ProfileError {
    /// The tool may exist elsewhere (one-shot dispatch) but has no
    /// orchestration profile and cannot run as a worker.
    #[error("no orchestration profile for tool: {0}")]
    Unsupported(String),
}

/// Default trailing window (non-blank lines) for state patterns.
pub const DEFAULT_PATTERN_WINDOW: usize = 30;

/// One prioritized state-classification pattern.
#[derive(Debug)]
pub struct StatePattern {
    pub name: &'static str,
    pub regex: Regex,
    pub state: WorkerState,
    /// Higher wins; ties resolved by declaration order
    pub priority: i32,
    /// Trailing non-blank window override (default 30)
    pub window: Option<usize>,
}

/// Static orchestration data for one tool.
#[derive(Debug)]
pub struct ToolProfile {
    pub tool: &'static str,
    pub start_command: &'static str,
    pub start_args: &'static [&'static str],
    /// Matches the idle prompt; also the completion pattern
    pub ready_pattern: Regex,
    /// First-run dialogs dismissed with Enter while waiting for readiness
    pub startup_dialog_pattern: Option<Regex>,
    pub dismiss_key: &'static str,
    /// Key chords sent before the window is killed, with a pause between
    pub exit_sequence: &'static [&'static [&'static str]],
    pub exit_delay_ms: u64,
    /// Sorted by descending priority at registry build time
    pub state_patterns: Vec<StatePattern>,
    /// Any match in the trailing ~15 lines proves the agent is producing output
    pub activity_patterns: Vec<Regex>,
    pub stuck_timeout_ms: u64,
}

impl ToolProfile {
    /// Full command line starting the interactive TUI.
    pub fn start_command_line(&self) -> String {
        if self.start_args.is_empty() {
            self.start_command.to_string()
        } else {
            format!("{} {}", self.start_command, self.start_args.join(" "))
        }
    }

    /// The completion pattern is the ready prompt reappearing.
    pub fn completion_pattern(&self) -> &Regex {
        &self.ready_pattern
    }
}

// Constant patterns are verified by the registry test that instantiates
// every profile.
#[allow(clippy::expect_used)]
fn re(pattern: &str) -> Regex {
    Regex::new(pattern).expect("constant regex pattern is valid")
}

fn claude_profile() -> ToolProfile {
    ToolProfile {
        tool: "claude",
        start_command: "claude",
        start_args: &[],
        ready_pattern: re(r"\? for shortcuts"),
        startup_dialog_pattern: Some(re(
            r"(?i)(do you trust the files in this folder|choose the text style|press enter to continue)",
        )),
        dismiss_key: "Escape",
        exit_sequence: &[&["C-c"], &["C-c"]],
        exit_delay_ms: 200,
        state_patterns: vec![
            StatePattern {
                name: "error_banner",
                regex: re(r"(?i)(api error|request failed|something went wrong|failed to connect)"),
                state: WorkerState::Error,
                priority: 90,
                window: None,
            },
            StatePattern {
                name: "rate_limited",
                regex: re(r"(?i)(rate limit|usage limit (reached|exceeded)|overloaded|too many requests)"),
                state: WorkerState::RateLimited,
                priority: 85,
                window: None,
            },
            StatePattern {
                name: "approval_dialog",
                regex: re(r"(?i)(do you want to (proceed|allow|make this edit)|❯ 1\. yes|allow this (command|tool))"),
                state: WorkerState::WaitingApproval,
                priority: 80,
                window: None,
            },
            StatePattern {
                name: "question_prompt",
                regex: re(r"(?i)(waiting for your (input|answer)|\?\s*$)"),
                state: WorkerState::WaitingInput,
                priority: 70,
                window: Some(10),
            },
            StatePattern {
                name: "spinner_active",
                regex: re(r"(?i)(esc to interrupt|[✻✶✢·] \w+ing|\d+ tokens)"),
                state: WorkerState::Working,
                priority: 60,
                window: Some(15),
            },
            StatePattern {
                name: "idle_prompt",
                regex: re(r"\? for shortcuts"),
                state: WorkerState::Idle,
                priority: 50,
                window: Some(10),
            },
        ],
        activity_patterns: vec![re(r"(?i)esc to interrupt"), re(r"[✻✶✢]"), re(r"\d+ tokens")],
        stuck_timeout_ms: 120_000,
    }
}

fn codex_profile() -> ToolProfile {
    ToolProfile {
        tool: "codex",
        start_command: "codex",
        start_args: &[],
        ready_pattern: re(r"(?i)(⏎ send|ctrl\+j newline)"),
        startup_dialog_pattern: Some(re(
            r"(?i)(allow codex to work in this (folder|directory)|trust this workspace)",
        )),
        dismiss_key: "Escape",
        exit_sequence: &[&["C-c"], &["C-c"]],
        exit_delay_ms: 200,
        state_patterns: vec![
            StatePattern {
                name: "error_banner",
                regex: re(r"(?i)(stream (error|disconnected)|unexpected status|^error:)"),
                state: WorkerState::Error,
                priority: 90,
                window: None,
            },
            StatePattern {
                name: "rate_limited",
                regex: re(r"(?i)(rate limit|429|quota exceeded)"),
                state: WorkerState::RateLimited,
                priority: 85,
                window: None,
            },
            StatePattern {
                name: "approval_dialog",
                regex: re(r"(?i)(allow command\?|approve this (action|command)|y to approve)"),
                state: WorkerState::WaitingApproval,
                priority: 80,
                window: None,
            },
            StatePattern {
                name: "question_prompt",
                regex: re(r"(?i)(awaiting your (input|reply)|\?\s*$)"),
                state: WorkerState::WaitingInput,
                priority: 70,
                window: Some(10),
            },
            StatePattern {
                name: "spinner_active",
                regex: re(r"(?i)(esc to interrupt|working \(\d+s)"),
                state: WorkerState::Working,
                priority: 60,
                window: Some(15),
            },
            StatePattern {
                name: "idle_prompt",
                regex: re(r"(?i)(⏎ send|ctrl\+j newline)"),
                state: WorkerState::Idle,
                priority: 50,
                window: Some(10),
            },
        ],
        activity_patterns: vec![re(r"(?i)esc to interrupt"), re(r"(?i)working \(\d+s")],
        stuck_timeout_ms: 180_000,
    }
}

fn gemini_profile() -> ToolProfile {
    ToolProfile {
        tool: "gemini",
        start_command: "gemini",
        start_args: &[],
        ready_pattern: re(r"(?i)type your message"),
        startup_dialog_pattern: Some(re(r"(?i)(select a theme|login with google)")),
        dismiss_key: "Escape",
        exit_sequence: &[&["C-c"], &["C-c"]],
        exit_delay_ms: 200,
        state_patterns: vec![
            StatePattern {
                name: "error_banner",
                regex: re(r"(?i)(error executing|fatal:|api error)"),
                state: WorkerState::Error,
                priority: 90,
                window: None,
            },
            StatePattern {
                name: "rate_limited",
                regex: re(r"(?i)(resource exhausted|rate limit|429)"),
                state: WorkerState::RateLimited,
                priority: 85,
                window: None,
            },
            StatePattern {
                name: "approval_dialog",
                regex: re(r"(?i)(apply this change\?|allow execution|yes, allow)"),
                state: WorkerState::WaitingApproval,
                priority: 80,
                window: None,
            },
            StatePattern {
                name: "question_prompt",
                regex: re(r"(?i)\?\s*$"),
                state: WorkerState::WaitingInput,
                priority: 70,
                window: Some(10),
            },
            StatePattern {
                name: "spinner_active",
                regex: re(r"(?i)(esc to cancel|[⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏])"),
                state: WorkerState::Working,
                priority: 60,
                window: Some(15),
            },
            StatePattern {
                name: "idle_prompt",
                regex: re(r"(?i)type your message"),
                state: WorkerState::Idle,
                priority: 50,
                window: Some(10),
            },
        ],
        activity_patterns: vec![re(r"(?i)esc to cancel"), re(r"[⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏]")],
        stuck_timeout_ms: 120_000,
    }
}

fn build_profiles() -> HashMap<&'static str, ToolProfile> {
    let mut profiles = HashMap::new();
    for mut profile in [claude_profile(), codex_profile(), gemini_profile()] {
        // Stable sort keeps declaration order as the tie-breaker
        profile.state_patterns.sort_by_key(|p| std::cmp::Reverse(p.priority));
        profiles.insert(profile.tool, profile);
    }
    profiles
}

static PROFILES: LazyLock<HashMap<&'static str, ToolProfile>> = LazyLock::new(build_profiles);

/// Look up the orchestration profile for a tool.
pub fn profile_for(tool: &str) -> Result<&'static ToolProfile, ProfileError> {
    PROFILES
        .get(tool)
        .ok_or_else(|| ProfileError::Unsupported(tool.to_string()))
}

/// Whether a tool can be orchestrated as a worker.
pub fn is_supported(tool: &str) -> bool {
    PROFILES.contains_key(tool)
}

/// Tools with orchestration profiles, sorted.
pub fn supported_tools() -> Vec<&'static str> {
    let mut tools: Vec<&'static str> = PROFILES.keys().copied().collect();
    tools.sort_unstable();
    tools
}

#[cfg(test)]
#[path = "profile_tests.rs"]
mod tests;
