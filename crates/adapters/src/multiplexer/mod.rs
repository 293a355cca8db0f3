// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Terminal multiplexer adapters.
//!
//! The orchestrator owns one multiplexer session with a window per worker.
//! Targets are opaque `"session:window"` strings handed back by
//! `create_window`; everything else addresses windows through them.

mod tmux;

pub use tmux::TmuxMultiplexer;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeMultiplexer, MuxCall};

use crate::text::trailing_nonblank;
use async_trait::async_trait;
use regex::Regex;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Errors from multiplexer operations
#[derive(Debug, Error)]
pub enum MultiplexerError {
    #[error("window not found: {0}")]
    NotFound(String),
    #[error("spawn failed: {0}")]
    SpawnFailed(String),
    #[error("command failed: {0}")]
    CommandFailed(String),
}

/// Adapter for driving terminal-multiplexer windows (tmux, etc.)
#[async_trait]
pub trait MultiplexerAdapter: Clone + Send + Sync + 'static {
    /// Idempotently create the orchestrator session.
    async fn ensure_session(&self) -> Result<(), MultiplexerError>;

    /// Check whether the orchestrator session exists.
    async fn session_exists(&self) -> Result<bool, MultiplexerError>;

    /// Kill the orchestrator session and every window in it.
    async fn kill_session(&self) -> Result<(), MultiplexerError>;

    /// Create a window running `command`, killing any prior window of the
    /// same name. Returns the target string for subsequent operations.
    async fn create_window(
        &self,
        name: &str,
        command: &str,
        cwd: Option<&Path>,
    ) -> Result<String, MultiplexerError>;

    /// Kill a window.
    async fn kill_window(&self, target: &str) -> Result<(), MultiplexerError>;

    /// Check whether a window's pane is still alive.
    async fn is_window_alive(&self, target: &str) -> Result<bool, MultiplexerError>;

    /// Send key tokens (named keys like `Enter`, `Escape`, `C-c` included).
    async fn send_keys(&self, target: &str, keys: &[String]) -> Result<(), MultiplexerError>;

    /// Type `text` literally (no key-token interpretation), give the TUI a
    /// moment to settle, then submit with Enter.
    async fn send_text(&self, target: &str, text: &str) -> Result<(), MultiplexerError>;

    /// Capture the pane's visible text plus the last `scrollback` lines
    /// of history (a negative start offset, e.g. -60).
    async fn capture_pane(&self, target: &str, scrollback: i32)
        -> Result<String, MultiplexerError>;

    /// Install a sidecar consumer appending every pane byte to `file`.
    async fn start_pipe_pane(&self, target: &str, file: &Path) -> Result<(), MultiplexerError>;

    /// Remove the pane's sidecar consumer.
    async fn stop_pipe_pane(&self, target: &str) -> Result<(), MultiplexerError>;

    /// Size of a pipe file in bytes, 0 when missing.
    async fn get_file_size(&self, path: &Path) -> u64 {
        crate::pipe::file_size(path).await
    }

    /// Last `lines` lines of a pipe file, ANSI-stripped; empty when missing.
    async fn read_pipe_tail(&self, path: &Path, lines: usize) -> String {
        crate::pipe::read_tail(path, lines).await
    }
}

/// Polling knobs for [`wait_for_ready`].
#[derive(Debug, Clone, Copy)]
pub struct ReadyPoll {
    pub max_wait: Duration,
    pub poll: Duration,
}

impl Default for ReadyPoll {
    fn default() -> Self {
        Self {
            max_wait: Duration::from_secs(30),
            poll: Duration::from_millis(500),
        }
    }
}

/// Poll a window's pane until its trailing output matches `ready`.
///
/// If `startup_dialog` matches the last ~5 non-blank lines first, Enter is
/// sent to dismiss the dialog and polling continues. Returns the first
/// matching capture, or the last capture once `max_wait` elapses.
pub async fn wait_for_ready<M: MultiplexerAdapter>(
    mux: &M,
    target: &str,
    ready: &Regex,
    startup_dialog: Option<&Regex>,
    opts: ReadyPoll,
) -> Result<String, MultiplexerError> {
    let deadline = tokio::time::Instant::now() + opts.max_wait;
    let mut last_capture = String::new();

    loop {
        match mux.capture_pane(target, -30).await {
            Ok(output) => {
                let stripped = crate::text::strip_ansi(&output);
                if let Some(dialog) = startup_dialog {
                    if dialog.is_match(&trailing_nonblank(&stripped, 5)) {
                        tracing::debug!(target, "dismissing startup dialog");
                        mux.send_keys(target, &["Enter".to_string()]).await?;
                        last_capture = stripped;
                        tokio::time::sleep(opts.poll).await;
                        continue;
                    }
                }
                if ready.is_match(&trailing_nonblank(&stripped, 10)) {
                    return Ok(stripped);
                }
                last_capture = stripped;
            }
            // Pane may not exist for the first few polls
            Err(err) => tracing::debug!(target, error = %err, "capture not ready"),
        }

        if tokio::time::Instant::now() >= deadline {
            tracing::warn!(target, "ready pattern not seen before timeout");
            return Ok(last_capture);
        }
        tokio::time::sleep(opts.poll).await;
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod mod_tests;
