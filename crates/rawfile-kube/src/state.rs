//! Persisted operator state
//!
//! The only state that outlives a reconcile cycle is the terminating flag.
//! Once set it is never cleared: a removed application keeps tearing down
//! whatever event arrives next.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use crate::error::{KubeError, Result};

/// State carried across reconcile cycles
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperatorState {
    #[serde(default)]
    pub terminating: bool,
}

/// Storage backend for [`OperatorState`]
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Load the state, default when nothing was saved yet
    async fn load(&self) -> Result<OperatorState>;

    /// Persist the state
    async fn save(&self, state: &OperatorState) -> Result<()>;
}

/// JSON file state store
pub struct FileStateStore {
    path: PathBuf,
}

impl FileStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

#[async_trait]
impl StateStore for FileStateStore {
    async fn load(&self) -> Result<OperatorState> {
        if !self.path.exists() {
            return Ok(OperatorState::default());
        }

        let data = tokio::fs::read(&self.path).await?;
        serde_json::from_slice(&data).map_err(|e| {
            KubeError::State(format!("failed to read {}: {}", self.path.display(), e))
        })
    }

    async fn save(&self, state: &OperatorState) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_vec_pretty(state)?;
        tokio::fs::write(&self.path, json).await?;
        Ok(())
    }
}

/// In-memory state store for testing
#[derive(Clone, Default)]
pub struct MemoryStateStore {
    state: Arc<RwLock<OperatorState>>,
    saves: Arc<RwLock<usize>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: OperatorState) -> Self {
        Self {
            state: Arc::new(RwLock::new(state)),
            ..Self::default()
        }
    }

    /// Current state without going through the trait
    pub fn snapshot(&self) -> OperatorState {
        self.state.read().unwrap().clone()
    }

    /// Number of saves performed
    pub fn save_count(&self) -> usize {
        *self.saves.read().unwrap()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn load(&self) -> Result<OperatorState> {
        Ok(self.snapshot())
    }

    async fn save(&self, state: &OperatorState) -> Result<()> {
        *self.state.write().unwrap() = state.clone();
        *self.saves.write().unwrap() += 1;
        Ok(())
    }
}
