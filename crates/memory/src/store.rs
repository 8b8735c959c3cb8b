//! Bounded working memory.

use crate::types::{MemoryEntry, MEMORY_CAPACITY};
use std::collections::VecDeque;
use tracing::trace;

/// Append-only log of an agent's completed tasks.
///
/// Oldest entries are evicted first once the log grows past its capacity.
/// Entries are never modified after insertion.
#[derive(Debug, Clone)]
pub struct MemoryLog {
    entries: VecDeque<MemoryEntry>,
    capacity: usize,
}

impl Default for MemoryLog {
    fn default() -> Self {
        Self::with_capacity(MEMORY_CAPACITY)
    }
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(MEMORY_CAPACITY)),
            capacity: capacity.max(1),
        }
    }

    /// Build a log from stored history, keeping only the newest entries.
    pub fn from_entries(entries: Vec<MemoryEntry>) -> Self {
        let mut log = Self::default();
        for entry in entries {
            log.push(entry);
        }
        log
    }

    pub fn push(&mut self, entry: MemoryEntry) {
        self.entries.push_back(entry);
        while self.entries.len() > self.capacity {
            if self.entries.pop_front().is_some() {
                trace!(capacity = self.capacity, "Evicted oldest memory entry");
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn snapshot(&self) -> Vec<MemoryEntry> {
        self.entries.iter().cloned().collect()
    }

    /// The newest `limit` entries, oldest first.
    pub fn recent(&self, limit: usize) -> Vec<MemoryEntry> {
        let skip = self.entries.len().saturating_sub(limit);
        self.entries.iter().skip(skip).cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MemoryEntry> {
        self.entries.iter()
    }
}
