// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn registry_has_the_three_orchestrated_tools() {
    assert_eq!(supported_tools(), vec!["claude", "codex", "gemini"]);
    for tool in supported_tools() {
        assert!(is_supported(tool));
        assert!(profile_for(tool).is_ok());
    }
}

#[test]
fn unknown_tool_is_unsupported() {
    assert!(!is_supported("aider"));
    let err = profile_for("aider").unwrap_err();
    assert_eq!(err.to_string(), "no orchestration profile for tool: aider");
}

#[test]
fn state_patterns_are_sorted_by_descending_priority() {
    for tool in supported_tools() {
        let profile = profile_for(tool).unwrap();
        let priorities: Vec<i32> = profile.state_patterns.iter().map(|p| p.priority).collect();
        let mut sorted = priorities.clone();
        sorted.sort_unstable_by_key(|p| std::cmp::Reverse(*p));
        assert_eq!(priorities, sorted, "{} patterns out of order", tool);
    }
}

#[test]
fn completion_pattern_is_the_ready_pattern() {
    let profile = profile_for("claude").unwrap();
    assert!(profile.completion_pattern().is_match("? for shortcuts"));
}

#[test]
fn start_command_line_joins_args() {
    let profile = profile_for("claude").unwrap();
    assert_eq!(profile.start_command_line(), "claude");
}

#[yare::parameterized(
    claude_approval = { "claude", "Do you want to make this edit to main.rs?", WorkerState::WaitingApproval },
    claude_rate     = { "claude", "You've hit your usage limit. Rate limit resets at 3pm.", WorkerState::RateLimited },
    claude_working  = { "claude", "✻ Pondering… (esc to interrupt)", WorkerState::Working },
    claude_idle     = { "claude", "> \n? for shortcuts", WorkerState::Idle },
    claude_error    = { "claude", "API Error: 500 internal server error", WorkerState::Error },
    codex_approval  = { "codex", "Allow command? shell: cargo test", WorkerState::WaitingApproval },
    codex_idle      = { "codex", "⏎ send   Ctrl+J newline", WorkerState::Idle },
    gemini_rate     = { "gemini", "Status 429: RESOURCE EXHAUSTED", WorkerState::RateLimited },
    gemini_working  = { "gemini", "⠙ Generating response (esc to cancel)", WorkerState::Working },
)]
fn representative_lines_match_their_state(tool: &str, line: &str, expected: WorkerState) {
    let profile = profile_for(tool).unwrap();
    let matched = profile
        .state_patterns
        .iter()
        .find(|p| p.regex.is_match(line))
        .map(|p| p.state);
    assert_eq!(matched, Some(expected), "line: {}", line);
}

#[test]
fn every_profile_has_an_idle_and_working_pattern() {
    for tool in supported_tools() {
        let profile = profile_for(tool).unwrap();
        let states: Vec<WorkerState> = profile.state_patterns.iter().map(|p| p.state).collect();
        assert!(states.contains(&WorkerState::Idle), "{} lacks idle", tool);
        assert!(states.contains(&WorkerState::Working), "{} lacks working", tool);
        assert!(
            states.contains(&WorkerState::RateLimited),
            "{} lacks rate_limited",
            tool
        );
        assert!(!profile.activity_patterns.is_empty());
        assert!(profile.stuck_timeout_ms > 0);
        assert!(!profile.exit_sequence.is_empty());
    }
}
