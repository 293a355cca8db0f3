// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Headless LLM escalation adapters.
//!
//! When Tier-1 rules can't decide, the engine forks a headless invocation of
//! a configured agent CLI and parses its stdout. The adapter only runs the
//! subprocess; prompt construction and response parsing live in the engine.

mod headless;

pub use headless::HeadlessEscalation;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeEscalation;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Errors from escalation invocations
#[derive(Debug, Error)]
pub enum EscalationError {
    #[error("no headless invocation for tool: {0}")]
    UnknownTool(String),
    #[error("escalation spawn failed: {0}")]
    Spawn(String),
    #[error("escalation exited with {code:?}: {stderr}")]
    NonZeroExit { code: Option<i32>, stderr: String },
    #[error("escalation timed out after {0}s")]
    TimedOut(u64),
}

/// Adapter for one-shot headless LLM invocations
#[async_trait]
pub trait EscalationAdapter: Clone + Send + Sync + 'static {
    /// Invoke `tool` headlessly with `prompt`, returning trimmed stdout.
    async fn invoke(
        &self,
        tool: &str,
        prompt: &str,
        timeout: Duration,
    ) -> Result<String, EscalationError>;
}
