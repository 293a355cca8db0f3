// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! hive-adapters: External-world adapters for the OpenHive engine.
//!
//! Every boundary the orchestrator touches — the terminal multiplexer, pipe
//! files on disk, the headless escalation CLI, git worktrees, and the task
//! store — is an `async_trait` behind which tests substitute in-memory
//! fakes (exported under the `test-support` feature).

pub mod escalation;
pub mod multiplexer;
pub mod pipe;
pub mod store;
pub mod subprocess;
pub mod text;
pub mod worktree;

pub use escalation::{EscalationAdapter, EscalationError, HeadlessEscalation};
pub use multiplexer::{
    wait_for_ready, MultiplexerAdapter, MultiplexerError, ReadyPoll, TmuxMultiplexer,
};
pub use store::{JsonTaskStore, NoopTaskStore, StoreError, TaskStore};
pub use text::strip_ansi;
pub use worktree::{GitWorktrees, Worktree, WorktreeAdapter, WorktreeError};

#[cfg(any(test, feature = "test-support"))]
pub use escalation::FakeEscalation;
#[cfg(any(test, feature = "test-support"))]
pub use multiplexer::{FakeMultiplexer, MuxCall};
#[cfg(any(test, feature = "test-support"))]
pub use store::MemoryTaskStore;
#[cfg(any(test, feature = "test-support"))]
pub use worktree::FakeWorktrees;
