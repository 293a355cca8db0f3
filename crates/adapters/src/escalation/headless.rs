// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Headless CLI escalation adapter

use super::{EscalationAdapter, EscalationError};
use crate::subprocess::run_with_timeout;
use async_trait::async_trait;
use std::time::Duration;
use tokio::process::Command;

/// Escalation adapter forking the real agent CLIs in one-shot mode.
#[derive(Clone, Default)]
pub struct HeadlessEscalation;

impl HeadlessEscalation {
    pub fn new() -> Self {
        Self
    }
}

/// Program and argv for a one-shot invocation of `tool`.
///
/// Each CLI has its own headless surface; these are the non-interactive
/// forms that print a complete response to stdout and exit.
pub fn headless_argv(tool: &str, prompt: &str) -> Result<(String, Vec<String>), EscalationError> {
    let argv = match tool {
        "claude" => vec![
            "-p".to_string(),
            prompt.to_string(),
            "--output-format".to_string(),
            "text".to_string(),
        ],
        "codex" => vec!["exec".to_string(), "--json".to_string(), prompt.to_string()],
        "gemini" => vec![
            "-p".to_string(),
            prompt.to_string(),
            "--output-format".to_string(),
            "stream-json".to_string(),
        ],
        other => return Err(EscalationError::UnknownTool(other.to_string())),
    };
    Ok((tool.to_string(), argv))
}

#[async_trait]
impl EscalationAdapter for HeadlessEscalation {
    async fn invoke(
        &self,
        tool: &str,
        prompt: &str,
        timeout: Duration,
    ) -> Result<String, EscalationError> {
        let (program, argv) = headless_argv(tool, prompt)?;

        tracing::debug!(tool, prompt_len = prompt.len(), "invoking headless escalation");

        let mut cmd = Command::new(&program);
        cmd.args(&argv);
        let output = run_with_timeout(cmd, timeout, "llm escalation")
            .await
            .map_err(|message| {
                if message.contains("timed out") {
                    EscalationError::TimedOut(timeout.as_secs())
                } else {
                    EscalationError::Spawn(message)
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            tracing::warn!(tool, stderr = %stderr, "escalation exited non-zero");
            return Err(EscalationError::NonZeroExit {
                code: output.status.code(),
                stderr,
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

#[cfg(test)]
#[path = "headless_tests.rs"]
mod tests;
