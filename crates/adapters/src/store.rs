// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task record persistence.
//!
//! The engine persists tasks as JSON documents keyed by ID. All writes are
//! best-effort from the orchestrator's point of view; it logs failures and
//! keeps ticking.

use async_trait::async_trait;
use hive_core::Task;
use std::path::PathBuf;
use thiserror::Error;

/// Errors from task persistence
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("serialize failed: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("write failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Adapter persisting task records
#[async_trait]
pub trait TaskStore: Clone + Send + Sync + 'static {
    async fn save(&self, task: &Task) -> Result<(), StoreError>;
}

/// Store writing one pretty-printed JSON document per task.
#[derive(Clone)]
pub struct JsonTaskStore {
    dir: PathBuf,
}

impl JsonTaskStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn task_path(&self, task: &Task) -> PathBuf {
        self.dir.join(format!("{}.json", task.id))
    }
}

#[async_trait]
impl TaskStore for JsonTaskStore {
    async fn save(&self, task: &Task) -> Result<(), StoreError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let json = serde_json::to_vec_pretty(task)?;
        tokio::fs::write(self.task_path(task), json).await?;
        Ok(())
    }
}

/// Store that drops every write (callers that don't persist).
#[derive(Clone, Default)]
pub struct NoopTaskStore;

#[async_trait]
impl TaskStore for NoopTaskStore {
    async fn save(&self, _task: &Task) -> Result<(), StoreError> {
        Ok(())
    }
}

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod memory {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// In-memory store recording every saved snapshot, in order.
    #[derive(Clone, Default)]
    pub struct MemoryTaskStore {
        saves: Arc<Mutex<Vec<Task>>>,
    }

    impl MemoryTaskStore {
        pub fn new() -> Self {
            Self::default()
        }

        /// Every save call, oldest first
        pub fn saves(&self) -> Vec<Task> {
            self.saves.lock().clone()
        }

        /// Latest saved snapshot for a task ID
        pub fn latest(&self, id: &str) -> Option<Task> {
            self.saves
                .lock()
                .iter()
                .rev()
                .find(|task| task.id == *id)
                .cloned()
        }
    }

    #[async_trait]
    impl TaskStore for MemoryTaskStore {
        async fn save(&self, task: &Task) -> Result<(), StoreError> {
            self.saves.lock().push(task.clone());
            Ok(())
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use memory::MemoryTaskStore;

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
