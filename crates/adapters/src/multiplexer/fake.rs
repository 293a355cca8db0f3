// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake multiplexer adapter for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{MultiplexerAdapter, MultiplexerError};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Recorded multiplexer call
#[derive(Debug, Clone, PartialEq)]
pub enum MuxCall {
    EnsureSession,
    KillSession,
    CreateWindow {
        name: String,
        command: String,
        cwd: Option<PathBuf>,
    },
    KillWindow {
        target: String,
    },
    SendKeys {
        target: String,
        keys: Vec<String>,
    },
    SendText {
        target: String,
        text: String,
    },
    CapturePane {
        target: String,
    },
    StartPipePane {
        target: String,
        file: PathBuf,
    },
    StopPipePane {
        target: String,
    },
}

#[derive(Debug, Clone)]
struct FakeWindow {
    pane: String,
    alive: bool,
    pipe_file: Option<PathBuf>,
}

#[derive(Default)]
struct FakeMuxState {
    session_alive: bool,
    windows: HashMap<String, FakeWindow>,
    pipe_sizes: HashMap<PathBuf, u64>,
    pipe_tails: HashMap<PathBuf, String>,
    calls: Vec<MuxCall>,
    /// Pane contents given to newly created windows
    default_pane: String,
    /// When set, the next create_window fails with this message
    fail_next_create: Option<String>,
}

/// Fake multiplexer adapter for testing.
///
/// Windows are in-memory records with settable pane text, liveness, and pipe
/// sizes/tails, so tests can script exactly what the engine observes.
#[derive(Clone, Default)]
pub struct FakeMultiplexer {
    inner: Arc<Mutex<FakeMuxState>>,
}

impl FakeMultiplexer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<MuxCall> {
        self.inner.lock().calls.clone()
    }

    /// Pane text every newly created window starts with (e.g. a ready banner)
    pub fn set_default_pane(&self, text: impl Into<String>) {
        self.inner.lock().default_pane = text.into();
    }

    /// Replace a window's pane content
    pub fn set_pane(&self, target: &str, text: impl Into<String>) {
        if let Some(win) = self.inner.lock().windows.get_mut(target) {
            win.pane = text.into();
        }
    }

    /// Mark a window dead or alive
    pub fn set_alive(&self, target: &str, alive: bool) {
        if let Some(win) = self.inner.lock().windows.get_mut(target) {
            win.alive = alive;
        }
    }

    /// Set the reported size of a pipe file
    pub fn set_pipe_size(&self, path: &Path, size: u64) {
        self.inner.lock().pipe_sizes.insert(path.to_path_buf(), size);
    }

    /// Grow a window's pipe file by `bytes` (simulates fresh output)
    pub fn grow_pipe(&self, target: &str, bytes: u64) {
        let mut inner = self.inner.lock();
        let Some(pipe) = inner
            .windows
            .get(target)
            .and_then(|w| w.pipe_file.clone())
        else {
            return;
        };
        *inner.pipe_sizes.entry(pipe).or_insert(0) += bytes;
    }

    /// Set the tail text returned for a pipe file
    pub fn set_pipe_tail(&self, path: &Path, tail: impl Into<String>) {
        self.inner
            .lock()
            .pipe_tails
            .insert(path.to_path_buf(), tail.into());
    }

    /// Make the next create_window call fail
    pub fn fail_next_create(&self, message: impl Into<String>) {
        self.inner.lock().fail_next_create = Some(message.into());
    }

    /// Text typed into a target via send_text, in order
    pub fn sent_text(&self, target: &str) -> Vec<String> {
        self.inner
            .lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                MuxCall::SendText { target: t, text } if t == target => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    /// Targets of all windows created so far
    pub fn window_targets(&self) -> Vec<String> {
        let mut targets: Vec<String> = self.inner.lock().windows.keys().cloned().collect();
        targets.sort();
        targets
    }
}

#[async_trait]
impl MultiplexerAdapter for FakeMultiplexer {
    async fn ensure_session(&self) -> Result<(), MultiplexerError> {
        let mut inner = self.inner.lock();
        inner.calls.push(MuxCall::EnsureSession);
        inner.session_alive = true;
        Ok(())
    }

    async fn session_exists(&self) -> Result<bool, MultiplexerError> {
        Ok(self.inner.lock().session_alive)
    }

    async fn kill_session(&self) -> Result<(), MultiplexerError> {
        let mut inner = self.inner.lock();
        inner.calls.push(MuxCall::KillSession);
        inner.session_alive = false;
        for win in inner.windows.values_mut() {
            win.alive = false;
        }
        Ok(())
    }

    async fn create_window(
        &self,
        name: &str,
        command: &str,
        cwd: Option<&Path>,
    ) -> Result<String, MultiplexerError> {
        let mut inner = self.inner.lock();
        inner.calls.push(MuxCall::CreateWindow {
            name: name.to_string(),
            command: command.to_string(),
            cwd: cwd.map(Path::to_path_buf),
        });

        if let Some(message) = inner.fail_next_create.take() {
            return Err(MultiplexerError::SpawnFailed(message));
        }

        let target = format!("fake:{}", name);
        let pane = inner.default_pane.clone();
        inner.windows.insert(
            target.clone(),
            FakeWindow {
                pane,
                alive: true,
                pipe_file: None,
            },
        );
        Ok(target)
    }

    async fn kill_window(&self, target: &str) -> Result<(), MultiplexerError> {
        let mut inner = self.inner.lock();
        inner.calls.push(MuxCall::KillWindow {
            target: target.to_string(),
        });
        if let Some(win) = inner.windows.get_mut(target) {
            win.alive = false;
        }
        Ok(())
    }

    async fn is_window_alive(&self, target: &str) -> Result<bool, MultiplexerError> {
        Ok(self
            .inner
            .lock()
            .windows
            .get(target)
            .map(|w| w.alive)
            .unwrap_or(false))
    }

    async fn send_keys(&self, target: &str, keys: &[String]) -> Result<(), MultiplexerError> {
        let mut inner = self.inner.lock();
        inner.calls.push(MuxCall::SendKeys {
            target: target.to_string(),
            keys: keys.to_vec(),
        });
        if !inner.windows.contains_key(target) {
            return Err(MultiplexerError::NotFound(target.to_string()));
        }
        Ok(())
    }

    async fn send_text(&self, target: &str, text: &str) -> Result<(), MultiplexerError> {
        let mut inner = self.inner.lock();
        inner.calls.push(MuxCall::SendText {
            target: target.to_string(),
            text: text.to_string(),
        });
        if !inner.windows.contains_key(target) {
            return Err(MultiplexerError::NotFound(target.to_string()));
        }
        Ok(())
    }

    async fn capture_pane(
        &self,
        target: &str,
        _scrollback: i32,
    ) -> Result<String, MultiplexerError> {
        let mut inner = self.inner.lock();
        inner.calls.push(MuxCall::CapturePane {
            target: target.to_string(),
        });
        match inner.windows.get(target) {
            Some(win) => Ok(win.pane.clone()),
            None => Err(MultiplexerError::NotFound(target.to_string())),
        }
    }

    async fn start_pipe_pane(&self, target: &str, file: &Path) -> Result<(), MultiplexerError> {
        let mut inner = self.inner.lock();
        inner.calls.push(MuxCall::StartPipePane {
            target: target.to_string(),
            file: file.to_path_buf(),
        });
        match inner.windows.get_mut(target) {
            Some(win) => {
                win.pipe_file = Some(file.to_path_buf());
                Ok(())
            }
            None => Err(MultiplexerError::NotFound(target.to_string())),
        }
    }

    async fn stop_pipe_pane(&self, target: &str) -> Result<(), MultiplexerError> {
        let mut inner = self.inner.lock();
        inner.calls.push(MuxCall::StopPipePane {
            target: target.to_string(),
        });
        if let Some(win) = inner.windows.get_mut(target) {
            win.pipe_file = None;
        }
        Ok(())
    }

    async fn get_file_size(&self, path: &Path) -> u64 {
        self.inner
            .lock()
            .pipe_sizes
            .get(path)
            .copied()
            .unwrap_or(0)
    }

    async fn read_pipe_tail(&self, path: &Path, _lines: usize) -> String {
        self.inner
            .lock()
            .pipe_tails
            .get(path)
            .cloned()
            .unwrap_or_default()
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
