//! Integration tests for the memory bridges.
//!
//! These exercise the file bridge end-to-end on a temporary directory,
//! including reopening, trimming and clearing.

use luxrig_memory::{JsonFileBridge, MemoryBridge, MemoryEntry, MemoryLog};
use serde_json::json;
use tempfile::TempDir;

fn entry(i: usize) -> MemoryEntry {
    MemoryEntry::new(json!({ "query": format!("q{i}") }), json!({ "ok": true }))
}

#[tokio::test]
async fn test_file_bridge_survives_reopen() {
    let dir = TempDir::new().unwrap();
    {
        let bridge = JsonFileBridge::open(dir.path()).await.unwrap();
        bridge.set("research-agent", &entry(1)).await.unwrap();
        bridge.set("research-agent", &entry(2)).await.unwrap();
    }

    let reopened = JsonFileBridge::open(dir.path()).await.unwrap();
    let history = reopened.get_all("research-agent").await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[1].task, json!({ "query": "q2" }));
}

#[tokio::test]
async fn test_file_bridge_missing_agent_is_empty() {
    let dir = TempDir::new().unwrap();
    let bridge = JsonFileBridge::open(dir.path()).await.unwrap();
    assert!(bridge.get_all("nobody").await.unwrap().is_empty());
    bridge.clear("nobody").await.unwrap();
}

#[tokio::test]
async fn test_file_bridge_trims_to_max_entries() {
    let dir = TempDir::new().unwrap();
    let bridge = JsonFileBridge::open(dir.path())
        .await
        .unwrap()
        .with_max_entries(3);

    for i in 0..5 {
        bridge.set("code-agent", &entry(i)).await.unwrap();
    }

    let history = bridge.get_all("code-agent").await.unwrap();
    assert_eq!(history.len(), 3);
    assert_eq!(history[0].task, json!({ "query": "q2" }));
}

#[tokio::test]
async fn test_file_bridge_clear() {
    let dir = TempDir::new().unwrap();
    let bridge = JsonFileBridge::open(dir.path()).await.unwrap();
    bridge.set("revenue-agent", &entry(0)).await.unwrap();
    bridge.clear("revenue-agent").await.unwrap();
    assert!(bridge.get_all("revenue-agent").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_corrupt_file_is_reported() {
    let dir = TempDir::new().unwrap();
    let bridge = JsonFileBridge::open(dir.path()).await.unwrap();
    tokio::fs::write(dir.path().join("broken.json"), b"not json")
        .await
        .unwrap();
    assert!(bridge.get_all("broken").await.is_err());
}

#[tokio::test]
async fn test_corrupt_file_is_set_aside_on_write() {
    let dir = TempDir::new().unwrap();
    let bridge = JsonFileBridge::open(dir.path()).await.unwrap();
    tokio::fs::write(dir.path().join("broken.json"), b"not json")
        .await
        .unwrap();

    bridge.set("broken", &entry(1)).await.unwrap();
    bridge.set("broken", &entry(2)).await.unwrap();

    let history = bridge.get_all("broken").await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].task, json!({ "query": "q1" }));

    let mut quarantined = 0;
    let mut files = tokio::fs::read_dir(dir.path()).await.unwrap();
    while let Some(file) = files.next_entry().await.unwrap() {
        let name = file.file_name().to_string_lossy().to_string();
        if name.starts_with("broken.json.corrupt-") {
            quarantined += 1;
            assert_eq!(tokio::fs::read(file.path()).await.unwrap(), b"not json");
        }
    }
    assert_eq!(quarantined, 1);
}

#[tokio::test]
async fn test_hydrated_log_is_bounded() {
    let dir = TempDir::new().unwrap();
    let bridge = JsonFileBridge::open(dir.path())
        .await
        .unwrap()
        .with_max_entries(500);
    for i in 0..120 {
        bridge.set("task-agent", &entry(i)).await.unwrap();
    }

    let log = MemoryLog::from_entries(bridge.get_all("task-agent").await.unwrap());
    assert_eq!(log.len(), 100);
    assert_eq!(log.snapshot()[0].task, json!({ "query": "q20" }));
}
