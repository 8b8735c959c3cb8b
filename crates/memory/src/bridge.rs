//! Durable memory bridge contract.

use crate::types::{MemoryEntry, MEMORY_CAPACITY};
use async_trait::async_trait;
use luxrig_common::Result;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Mirrors an agent's working memory to storage outside the process.
///
/// Addressed by agent id, so one bridge can be shared by every agent.
/// Callers treat all three operations as best effort.
#[async_trait]
pub trait MemoryBridge: Send + Sync {
    /// Stored history for `agent_id`, oldest first.
    async fn get_all(&self, agent_id: &str) -> Result<Vec<MemoryEntry>>;

    /// Append one entry to the stored history.
    async fn set(&self, agent_id: &str, entry: &MemoryEntry) -> Result<()>;

    /// Drop all stored history for `agent_id`.
    async fn clear(&self, agent_id: &str) -> Result<()>;
}

#[async_trait]
impl<T: MemoryBridge + ?Sized> MemoryBridge for Arc<T> {
    async fn get_all(&self, agent_id: &str) -> Result<Vec<MemoryEntry>> {
        (**self).get_all(agent_id).await
    }

    async fn set(&self, agent_id: &str, entry: &MemoryEntry) -> Result<()> {
        (**self).set(agent_id, entry).await
    }

    async fn clear(&self, agent_id: &str) -> Result<()> {
        (**self).clear(agent_id).await
    }
}

/// Process-local bridge backed by a shared map.
///
/// Each history keeps at most `max_entries`, dropping the oldest first.
#[derive(Debug, Clone)]
pub struct InMemoryBridge {
    histories: Arc<RwLock<HashMap<String, Vec<MemoryEntry>>>>,
    max_entries: usize,
}

impl Default for InMemoryBridge {
    fn default() -> Self {
        Self {
            histories: Arc::default(),
            max_entries: MEMORY_CAPACITY,
        }
    }
}

impl InMemoryBridge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries.max(1);
        self
    }

    /// Number of entries stored for `agent_id`.
    pub async fn len(&self, agent_id: &str) -> usize {
        self.histories
            .read()
            .await
            .get(agent_id)
            .map(Vec::len)
            .unwrap_or(0)
    }
}

#[async_trait]
impl MemoryBridge for InMemoryBridge {
    async fn get_all(&self, agent_id: &str) -> Result<Vec<MemoryEntry>> {
        Ok(self
            .histories
            .read()
            .await
            .get(agent_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn set(&self, agent_id: &str, entry: &MemoryEntry) -> Result<()> {
        debug!(agent = %agent_id, "Storing memory entry");
        let mut histories = self.histories.write().await;
        let history = histories.entry(agent_id.to_string()).or_default();
        history.push(entry.clone());
        if history.len() > self.max_entries {
            let excess = history.len() - self.max_entries;
            history.drain(..excess);
        }
        Ok(())
    }

    async fn clear(&self, agent_id: &str) -> Result<()> {
        self.histories.write().await.remove(agent_id);
        Ok(())
    }
}
