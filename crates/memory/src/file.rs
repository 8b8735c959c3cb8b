//! JSON-file memory bridge.

use crate::bridge::MemoryBridge;
use crate::types::{MemoryEntry, MEMORY_CAPACITY};
use async_trait::async_trait;
use luxrig_common::{now_millis, LuxError, Result};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use std::fmt::Write;
use tracing::{debug, info, warn};

/// Stores each agent's history as a JSON array in `<dir>/<agent id>.json`.
///
/// Files are rewritten through a temporary sibling and renamed into place.
/// Only the newest `max_entries` are kept on disk. Ids are escaped so that
/// distinct ids never share a file: ASCII letters, digits and `-` are kept
/// and every other byte becomes `_xx` in lowercase hex.
pub struct JsonFileBridge {
    dir: PathBuf,
    max_entries: usize,
    write_lock: Mutex<()>,
}

impl JsonFileBridge {
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        info!(dir = %dir.display(), "Opened file memory bridge");
        Ok(Self {
            dir,
            max_entries: MEMORY_CAPACITY,
            write_lock: Mutex::new(()),
        })
    }

    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries.max(1);
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, agent_id: &str) -> PathBuf {
        let mut name = String::with_capacity(agent_id.len());
        for byte in agent_id.bytes() {
            if byte.is_ascii_alphanumeric() || byte == b'-' {
                name.push(byte as char);
            } else {
                let _ = write!(name, "_{byte:02x}");
            }
        }
        self.dir.join(format!("{name}.json"))
    }

    /// Move an unreadable history aside so new entries can be stored.
    async fn quarantine(&self, path: &Path) -> Result<()> {
        let aside = path.with_extension(format!("json.corrupt-{}", now_millis()));
        tokio::fs::rename(path, &aside).await?;
        warn!(
            file = %path.display(),
            moved_to = %aside.display(),
            "Quarantined unreadable memory file"
        );
        Ok(())
    }

    async fn read(&self, path: &Path) -> Result<Vec<MemoryEntry>> {
        match self.read_raw(path).await? {
            Some(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                LuxError::Memory(format!("corrupt memory file {}: {e}", path.display()))
            }),
            None => Ok(Vec::new()),
        }
    }

    async fn read_raw(&self, path: &Path) -> Result<Option<Vec<u8>>> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, path: &Path, entries: &[MemoryEntry]) -> Result<()> {
        let tmp = path.with_extension("json.tmp");
        let bytes = serde_json::to_vec_pretty(entries)?;
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }
}

#[async_trait]
impl MemoryBridge for JsonFileBridge {
    async fn get_all(&self, agent_id: &str) -> Result<Vec<MemoryEntry>> {
        self.read(&self.path_for(agent_id)).await
    }

    async fn set(&self, agent_id: &str, entry: &MemoryEntry) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let path = self.path_for(agent_id);
        let mut entries = match self.read_raw(&path).await? {
            Some(bytes) => match serde_json::from_slice::<Vec<MemoryEntry>>(&bytes) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!(agent = %agent_id, error = %e, "Memory file is corrupt, starting fresh");
                    self.quarantine(&path).await?;
                    Vec::new()
                }
            },
            None => Vec::new(),
        };
        entries.push(entry.clone());
        let overflow = entries.len().saturating_sub(self.max_entries);
        entries.drain(..overflow);
        debug!(agent = %agent_id, stored = entries.len(), "Persisting memory file");
        self.write(&path, &entries).await
    }

    async fn clear(&self, agent_id: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        match tokio::fs::remove_file(self.path_for(agent_id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
