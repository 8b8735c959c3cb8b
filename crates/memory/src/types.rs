//! Memory types and configuration.

use luxrig_common::now_millis;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Maximum number of entries kept in an agent's working memory.
pub const MEMORY_CAPACITY: usize = 100;

/// One completed task and what it produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryEntry {
    /// The task as it was handed to the agent
    pub task: serde_json::Value,

    /// The value `process_task` returned
    pub result: serde_json::Value,

    /// Completion timestamp (Unix millis)
    pub timestamp: u64,
}

impl MemoryEntry {
    pub fn new(task: serde_json::Value, result: serde_json::Value) -> Self {
        Self {
            task,
            result,
            timestamp: now_millis(),
        }
    }
}

/// Which durable bridge to attach to agents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BridgeBackend {
    /// Working memory only, lost on teardown
    #[default]
    None,
    /// Process-wide map, survives agent re-creation but not restarts
    Memory,
    /// One JSON file per agent under `path`
    File,
}

/// Configuration for the memory system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    #[serde(default)]
    pub backend: BridgeBackend,

    /// Directory for the file backend
    #[serde(default = "default_memory_path")]
    pub path: PathBuf,
}

fn default_memory_path() -> PathBuf {
    PathBuf::from(".luxrig/memory")
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            backend: BridgeBackend::default(),
            path: default_memory_path(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn entry_records_completion_time() {
        let entry = MemoryEntry::new(json!("task"), json!("result"));
        assert!(entry.timestamp > 0);
        assert_eq!(entry.task, json!("task"));
    }

    #[test]
    fn config_defaults_to_no_bridge() {
        let config: MemoryConfig = serde_json::from_value(json!({})).unwrap();
        assert_eq!(config.backend, BridgeBackend::None);
        assert_eq!(config.path, PathBuf::from(".luxrig/memory"));
    }

    #[test]
    fn backend_parses_lowercase() {
        let config: MemoryConfig =
            serde_json::from_value(json!({ "backend": "file", "path": "/tmp/mem" })).unwrap();
        assert_eq!(config.backend, BridgeBackend::File);
        assert_eq!(config.path, PathBuf::from("/tmp/mem"));
    }
}
