// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pane-output state classification.
//!
//! Input is already ANSI-stripped pane text. Patterns test a trailing window
//! of non-blank lines (per-pattern override, else 30); the highest-priority
//! match wins. Empty output means the TUI hasn't painted yet (`starting`);
//! anything unclassified is treated as `working`, which the stuck refinement
//! can later rewrite.

use crate::profile::{ToolProfile, DEFAULT_PATTERN_WINDOW};
use hive_adapters::text::{last_lines, trailing_nonblank};
use hive_core::{StateSnapshot, WorkerState};

/// Lines scanned by [`StateDetector::has_activity`].
const ACTIVITY_WINDOW: usize = 15;

/// Lines scanned by [`StateDetector::is_complete`].
const COMPLETION_WINDOW: usize = 5;

/// Classifies pane output for one tool.
#[derive(Debug, Clone, Copy)]
pub struct StateDetector {
    profile: &'static ToolProfile,
}

impl StateDetector {
    pub fn new(profile: &'static ToolProfile) -> Self {
        Self { profile }
    }

    /// Classify `pane_text` into a state snapshot.
    pub fn detect(&self, pane_text: &str, now_ms: u64) -> StateSnapshot {
        for pattern in &self.profile.state_patterns {
            let window = pattern.window.unwrap_or(DEFAULT_PATTERN_WINDOW);
            let tail = trailing_nonblank(pane_text, window);
            if pattern.regex.is_match(&tail) {
                return StateSnapshot {
                    state: pattern.state,
                    matched_pattern: pattern.name.to_string(),
                    pane_text: pane_text.to_string(),
                    timestamp_ms: now_ms,
                };
            }
        }

        if pane_text.trim().is_empty() {
            return StateSnapshot {
                state: WorkerState::Starting,
                matched_pattern: "empty_pane".to_string(),
                pane_text: pane_text.to_string(),
                timestamp_ms: now_ms,
            };
        }

        StateSnapshot {
            state: WorkerState::Working,
            matched_pattern: "unclassified_output".to_string(),
            pane_text: pane_text.to_string(),
            timestamp_ms: now_ms,
        }
    }

    /// Whether the trailing ~15 lines show the agent producing output.
    pub fn has_activity(&self, pane_text: &str) -> bool {
        let tail: String = last_lines(pane_text, ACTIVITY_WINDOW).join("\n");
        self.profile
            .activity_patterns
            .iter()
            .any(|pattern| pattern.is_match(&tail))
    }

    /// Whether the trailing ~5 lines show the ready prompt again.
    pub fn is_complete(&self, pane_text: &str) -> bool {
        let tail: String = last_lines(pane_text, COMPLETION_WINDOW).join("\n");
        self.profile.completion_pattern().is_match(&tail)
    }
}

/// Rewrite `working` to `stuck` when output hasn't changed past the timeout.
///
/// The only producer of `stuck` in the system. Idempotent: non-`working`
/// snapshots (including already-`stuck` ones) pass through untouched. The
/// measured quiet period is recorded in the matched-pattern field.
pub fn refine_state(
    snapshot: StateSnapshot,
    last_output_change_at_ms: u64,
    stuck_timeout_ms: u64,
) -> StateSnapshot {
    if snapshot.state != WorkerState::Working {
        return snapshot;
    }
    let quiet_ms = snapshot.timestamp_ms.saturating_sub(last_output_change_at_ms);
    if quiet_ms <= stuck_timeout_ms {
        return snapshot;
    }
    StateSnapshot {
        state: WorkerState::Stuck,
        matched_pattern: format!("no output change for {}ms", quiet_ms),
        ..snapshot
    }
}

#[cfg(test)]
#[path = "detector_tests.rs"]
mod tests;
