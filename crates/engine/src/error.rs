// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine error types

use crate::profile::ProfileError;
use crate::worker::WorkerError;
use hive_adapters::MultiplexerError;
use thiserror::Error;

/// Errors surfaced by orchestrator operations
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error(transparent)]
    Profile(#[from] ProfileError),
    #[error(transparent)]
    Worker(#[from] WorkerError),
    #[error("multiplexer error: {0}")]
    Mux(#[from] MultiplexerError),
}
