// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Git worktree adapter.
//!
//! Worktree creation is an optional dispatch-time collaborator; failures are
//! non-fatal to the task, so errors here carry enough context to log and
//! move on.

use crate::subprocess::{run_with_timeout, GIT_WORKTREE_TIMEOUT};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::process::Command;

/// Errors from worktree operations
#[derive(Debug, Error)]
pub enum WorktreeError {
    #[error("repo root required for worktree creation")]
    MissingRepoRoot,
    #[error("worktree dir setup failed: {0}")]
    Setup(String),
    #[error("git worktree add failed: {0}")]
    GitFailed(String),
}

/// A created worktree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Worktree {
    pub path: PathBuf,
    pub branch: String,
}

/// Adapter for creating task worktrees
#[async_trait]
pub trait WorktreeAdapter: Clone + Send + Sync + 'static {
    /// Create a worktree for `task_id` under `worktree_dir`, branching from
    /// the repo's current HEAD.
    async fn create_worktree(
        &self,
        task_id: &str,
        worktree_dir: &Path,
        repo_root: Option<&Path>,
    ) -> Result<Worktree, WorktreeError>;
}

/// Real git-backed worktree adapter
#[derive(Clone, Default)]
pub struct GitWorktrees;

impl GitWorktrees {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl WorktreeAdapter for GitWorktrees {
    async fn create_worktree(
        &self,
        task_id: &str,
        worktree_dir: &Path,
        repo_root: Option<&Path>,
    ) -> Result<Worktree, WorktreeError> {
        let repo_root = repo_root.ok_or(WorktreeError::MissingRepoRoot)?;
        let path = worktree_dir.join(task_id);
        let branch = format!("hive/{}", task_id);

        tokio::fs::create_dir_all(worktree_dir)
            .await
            .map_err(|e| WorktreeError::Setup(e.to_string()))?;

        let mut cmd = Command::new("git");
        cmd.args([
            "-C",
            &repo_root.display().to_string(),
            "worktree",
            "add",
            "-b",
            &branch,
            &path.display().to_string(),
        ])
        .env_remove("GIT_DIR")
        .env_remove("GIT_WORK_TREE");

        let output = run_with_timeout(cmd, GIT_WORKTREE_TIMEOUT, "git worktree add")
            .await
            .map_err(WorktreeError::GitFailed)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(WorktreeError::GitFailed(stderr.trim().to_string()));
        }

        tracing::info!(task_id, path = %path.display(), branch = %branch, "worktree created");
        Ok(Worktree { path, branch })
    }
}

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[derive(Default)]
    struct FakeWorktreeState {
        fail: bool,
        created: Vec<String>,
    }

    /// Fake worktree adapter for testing
    #[derive(Clone, Default)]
    pub struct FakeWorktrees {
        inner: Arc<Mutex<FakeWorktreeState>>,
    }

    impl FakeWorktrees {
        pub fn new() -> Self {
            Self::default()
        }

        /// Make all subsequent creations fail
        pub fn set_failing(&self, fail: bool) {
            self.inner.lock().fail = fail;
        }

        /// Task IDs worktrees were created for, in order
        pub fn created(&self) -> Vec<String> {
            self.inner.lock().created.clone()
        }
    }

    #[async_trait]
    impl WorktreeAdapter for FakeWorktrees {
        async fn create_worktree(
            &self,
            task_id: &str,
            worktree_dir: &Path,
            _repo_root: Option<&Path>,
        ) -> Result<Worktree, WorktreeError> {
            let mut inner = self.inner.lock();
            if inner.fail {
                return Err(WorktreeError::GitFailed("scripted failure".into()));
            }
            inner.created.push(task_id.to_string());
            Ok(Worktree {
                path: worktree_dir.join(task_id),
                branch: format!("hive/{}", task_id),
            })
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeWorktrees;

#[cfg(test)]
#[path = "worktree_tests.rs"]
mod tests;
