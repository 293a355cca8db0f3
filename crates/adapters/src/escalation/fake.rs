// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake escalation adapter for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{EscalationAdapter, EscalationError};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

#[derive(Default)]
struct FakeEscalationState {
    /// Scripted responses, consumed front to back; empty queue yields ""
    responses: VecDeque<Result<String, String>>,
    /// (tool, prompt) pairs, in invocation order
    invocations: Vec<(String, String)>,
}

/// Fake escalation adapter with scripted responses.
#[derive(Clone, Default)]
pub struct FakeEscalation {
    inner: Arc<Mutex<FakeEscalationState>>,
}

impl FakeEscalation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful response.
    pub fn push_response(&self, response: impl Into<String>) {
        self.inner
            .lock()
            .responses
            .push_back(Ok(response.into()));
    }

    /// Queue a failed invocation.
    pub fn push_failure(&self, message: impl Into<String>) {
        self.inner
            .lock()
            .responses
            .push_back(Err(message.into()));
    }

    /// All (tool, prompt) pairs invoked so far.
    pub fn invocations(&self) -> Vec<(String, String)> {
        self.inner.lock().invocations.clone()
    }

    /// Prompts sent so far (convenience over `invocations`).
    pub fn prompts(&self) -> Vec<String> {
        self.inner
            .lock()
            .invocations
            .iter()
            .map(|(_, prompt)| prompt.clone())
            .collect()
    }
}

#[async_trait]
impl EscalationAdapter for FakeEscalation {
    async fn invoke(
        &self,
        tool: &str,
        prompt: &str,
        _timeout: Duration,
    ) -> Result<String, EscalationError> {
        let mut inner = self.inner.lock();
        inner
            .invocations
            .push((tool.to_string(), prompt.to_string()));
        match inner.responses.pop_front() {
            Some(Ok(response)) => Ok(response),
            Some(Err(message)) => Err(EscalationError::Spawn(message)),
            None => Ok(String::new()),
        }
    }
}
