// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tmux multiplexer adapter

use super::{MultiplexerAdapter, MultiplexerError};
use crate::subprocess::{run_with_timeout, MUX_TIMEOUT};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::Path;
use std::process::Output;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;

/// Fixed session name for the orchestrator.
pub const ORCH_SESSION: &str = "openhive-orch";

/// Viewport for the detached session. Wide enough that agent TUIs don't
/// wrap their status lines, which would break state patterns.
const SESSION_WIDTH: &str = "220";
const SESSION_HEIGHT: &str = "60";

/// Settle delay between literal text and the Enter submitting it.
const TEXT_SETTLE: Duration = Duration::from_millis(500);

/// Tmux-based multiplexer adapter
#[derive(Clone)]
pub struct TmuxMultiplexer {
    session: String,
    /// Cached "session created" flag; revalidated against tmux on use
    session_ready: Arc<Mutex<bool>>,
}

impl TmuxMultiplexer {
    pub fn new() -> Self {
        Self::with_session(ORCH_SESSION)
    }

    /// Use a non-default session name (tests, parallel engines).
    pub fn with_session(session: impl Into<String>) -> Self {
        Self {
            session: session.into(),
            session_ready: Arc::new(Mutex::new(false)),
        }
    }

    async fn tmux(&self, args: &[&str], what: &str) -> Result<Output, MultiplexerError> {
        let mut cmd = Command::new("tmux");
        cmd.args(args);
        run_with_timeout(cmd, MUX_TIMEOUT, what)
            .await
            .map_err(MultiplexerError::CommandFailed)
    }

    fn window_target(&self, name: &str) -> String {
        format!("{}:{}", self.session, name)
    }
}

impl Default for TmuxMultiplexer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MultiplexerAdapter for TmuxMultiplexer {
    async fn ensure_session(&self) -> Result<(), MultiplexerError> {
        // The cached flag is only trusted when tmux still agrees; the
        // server may have been killed out from under us.
        if *self.session_ready.lock() && self.session_exists().await? {
            return Ok(());
        }

        if !self.session_exists().await? {
            let output = self
                .tmux(
                    &[
                        "new-session",
                        "-d",
                        "-s",
                        &self.session,
                        "-x",
                        SESSION_WIDTH,
                        "-y",
                        SESSION_HEIGHT,
                    ],
                    "tmux new-session",
                )
                .await?;
            if !output.status.success() {
                let stderr = String::from_utf8_lossy(&output.stderr);
                // A concurrent creator losing the race is fine
                if !stderr.contains("duplicate session") {
                    tracing::error!(session = %self.session, stderr = %stderr, "tmux new-session failed");
                    return Err(MultiplexerError::SpawnFailed(stderr.to_string()));
                }
            }
        }

        *self.session_ready.lock() = true;
        Ok(())
    }

    async fn session_exists(&self) -> Result<bool, MultiplexerError> {
        let output = self
            .tmux(&["has-session", "-t", &self.session], "tmux has-session")
            .await?;
        Ok(output.status.success())
    }

    async fn kill_session(&self) -> Result<(), MultiplexerError> {
        let _ = self
            .tmux(&["kill-session", "-t", &self.session], "tmux kill-session")
            .await?;
        // Session might already be gone, which is fine
        *self.session_ready.lock() = false;
        Ok(())
    }

    async fn create_window(
        &self,
        name: &str,
        command: &str,
        cwd: Option<&Path>,
    ) -> Result<String, MultiplexerError> {
        let target = self.window_target(name);

        // Stale window from a previous worker with this name
        let _ = self
            .tmux(&["kill-window", "-t", &target], "tmux kill-window")
            .await;

        let cwd_str = cwd.map(|p| p.display().to_string());
        let mut args = vec!["new-window", "-t", self.session.as_str(), "-n", name];
        if let Some(ref dir) = cwd_str {
            args.push("-c");
            args.push(dir);
        }
        args.push(command);

        let output = self.tmux(&args, "tmux new-window").await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::error!(target = %target, stderr = %stderr, "tmux new-window failed");
            return Err(MultiplexerError::SpawnFailed(stderr.to_string()));
        }

        // Log stderr even on success - may contain useful warnings
        if !output.stderr.is_empty() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::warn!(target = %target, stderr = %stderr, "tmux new-window stderr (non-fatal)");
        }

        Ok(target)
    }

    async fn kill_window(&self, target: &str) -> Result<(), MultiplexerError> {
        let _ = self
            .tmux(&["kill-window", "-t", target], "tmux kill-window")
            .await?;
        // Window might already be dead, which is fine
        Ok(())
    }

    async fn is_window_alive(&self, target: &str) -> Result<bool, MultiplexerError> {
        let output = self
            .tmux(
                &["display-message", "-t", target, "-p", "#{pane_dead}"],
                "tmux display-message",
            )
            .await?;
        if !output.status.success() {
            return Ok(false);
        }
        let dead = String::from_utf8_lossy(&output.stdout);
        Ok(dead.trim() != "1")
    }

    async fn send_keys(&self, target: &str, keys: &[String]) -> Result<(), MultiplexerError> {
        let mut args = vec!["send-keys", "-t", target];
        args.extend(keys.iter().map(String::as_str));
        let output = self.tmux(&args, "tmux send-keys").await?;
        if !output.status.success() {
            return Err(MultiplexerError::NotFound(target.to_string()));
        }
        Ok(())
    }

    async fn send_text(&self, target: &str, text: &str) -> Result<(), MultiplexerError> {
        // -l = literal mode (no key name interpretation)
        // -- = end of options (handles text starting with -)
        let output = self
            .tmux(
                &["send-keys", "-t", target, "-l", "--", text],
                "tmux send-keys -l",
            )
            .await?;
        if !output.status.success() {
            return Err(MultiplexerError::NotFound(target.to_string()));
        }

        // Let the TUI ingest the paste before submitting
        tokio::time::sleep(TEXT_SETTLE).await;

        self.send_keys(target, &["Enter".to_string()]).await
    }

    async fn capture_pane(
        &self,
        target: &str,
        scrollback: i32,
    ) -> Result<String, MultiplexerError> {
        let start = scrollback.to_string();
        let output = self
            .tmux(
                &["capture-pane", "-t", target, "-p", "-S", &start],
                "tmux capture-pane",
            )
            .await?;
        if !output.status.success() {
            return Err(MultiplexerError::NotFound(target.to_string()));
        }
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    async fn start_pipe_pane(&self, target: &str, file: &Path) -> Result<(), MultiplexerError> {
        let sink = format!("cat >> {}", shell_quote(&file.display().to_string()));
        let output = self
            .tmux(
                &["pipe-pane", "-t", target, "-o", &sink],
                "tmux pipe-pane",
            )
            .await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(MultiplexerError::CommandFailed(format!(
                "pipe-pane: {}",
                stderr.trim()
            )));
        }
        Ok(())
    }

    async fn stop_pipe_pane(&self, target: &str) -> Result<(), MultiplexerError> {
        // pipe-pane with no command removes the existing pipe
        let _ = self
            .tmux(&["pipe-pane", "-t", target], "tmux pipe-pane off")
            .await?;
        Ok(())
    }
}

/// Single-quote a path for the shell command tmux runs the pipe through.
fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

#[cfg(test)]
#[path = "tmux_tests.rs"]
mod tests;
