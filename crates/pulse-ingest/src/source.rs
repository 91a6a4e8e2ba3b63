//! Log sources: the data directory on disk and an in-memory map

use anyhow::{Context, Result};
use async_trait::async_trait;
use pulse_core::{LogSource, Resource};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Serves resources from files under a data directory
#[derive(Debug, Clone)]
pub struct FsSource {
    root: PathBuf,
}

impl FsSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl LogSource for FsSource {
    async fn fetch(&self, resource: &Resource) -> Result<String> {
        let path = self.root.join(resource.path());
        debug!(path = %path.display(), "reading log");
        tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))
    }
}

/// Serves resources from memory
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    logs: Arc<RwLock<HashMap<Resource, String>>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert for fixtures
    pub fn with(self, resource: Resource, text: impl Into<String>) -> Self {
        // Fresh source, so the lock is uncontended
        if let Ok(mut logs) = self.logs.try_write() {
            logs.insert(resource, text.into());
        }
        self
    }

    pub async fn insert(&self, resource: Resource, text: impl Into<String>) {
        self.logs.write().await.insert(resource, text.into());
    }

    pub async fn remove(&self, resource: &Resource) -> Option<String> {
        self.logs.write().await.remove(resource)
    }
}

#[async_trait]
impl LogSource for MemorySource {
    async fn fetch(&self, resource: &Resource) -> Result<String> {
        self.logs
            .read()
            .await
            .get(resource)
            .cloned()
            .with_context(|| format!("No such resource: {resource}"))
    }
}
