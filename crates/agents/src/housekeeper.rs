//! Housekeeper agent - folder sync settings, workspace backups, disk usage
//! and cleanup estimates.
//!
//! Sync settings live outside agent memory in a `watch` channel so UIs and
//! other tasks can follow changes with [`HousekeeperAgent::subscribe`].

use crate::agent::{AgentProfile, TaskProcessor};
use crate::backup::{self, BackupStatus};
use async_trait::async_trait;
use luxrig_common::{now_millis, AgentCapability, LuxError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use sysinfo::Disks;
use tokio::sync::watch;
use tracing::{info, warn};

const MIB: u64 = 1024 * 1024;
const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    #[default]
    Idle,
    Syncing,
    Error,
    Success,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_folders")]
    pub folders: Vec<String>,
    #[serde(default)]
    pub last_sync: Option<u64>,
    #[serde(default)]
    pub sync_status: SyncStatus,
    /// Git checkout that backups commit and push
    #[serde(default = "default_workspace")]
    pub workspace: PathBuf,
}

fn default_workspace() -> PathBuf {
    PathBuf::from(".")
}

fn default_folders() -> Vec<String> {
    vec!["Fresh-Start".to_string(), "Nexus".to_string()]
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            folders: default_folders(),
            last_sync: None,
            sync_status: SyncStatus::Idle,
            workspace: default_workspace(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum HousekeeperTask {
    GetSyncConfig,
    UpdateSyncConfig {
        #[serde(default)]
        enabled: Option<bool>,
        #[serde(default)]
        folders: Option<Vec<String>>,
    },
    AddFolder {
        folder: String,
    },
    RemoveFolder {
        folder: String,
    },
    TriggerSync,
    GetBackupStatus,
    TriggerBackup,
    GetDiskStatus,
    CleanupSuggestions,
    PerformCleanup {
        #[serde(default)]
        clear_next_cache: bool,
        #[serde(default)]
        clear_logs: bool,
        #[serde(default)]
        clear_temp_files: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncOutcome {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiskStatus {
    pub mount_point: PathBuf,
    pub total_gb: f64,
    pub used_gb: f64,
    pub free_gb: f64,
    pub percent_used: f64,
}

impl DiskStatus {
    fn from_space(mount_point: &Path, total: u64, available: u64) -> Self {
        let used = total.saturating_sub(available);
        let round = |v: f64| (v * 100.0).round() / 100.0;
        let percent_used = if total == 0 {
            0.0
        } else {
            round(used as f64 / total as f64 * 100.0)
        };
        Self {
            mount_point: mount_point.to_path_buf(),
            total_gb: round(total as f64 / GIB),
            used_gb: round(used as f64 / GIB),
            free_gb: round(available as f64 / GIB),
            percent_used,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CleanupResult {
    pub files_removed: u64,
    pub bytes_freed: u64,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum HousekeeperOutput {
    Config(SyncConfig),
    Sync(SyncOutcome),
    Backup(BackupStatus),
    Disk(DiskStatus),
    Suggestions { suggestions: Vec<String> },
    Cleanup(CleanupResult),
}

pub struct HousekeeperAgent {
    sync: watch::Sender<SyncConfig>,
}

impl Default for HousekeeperAgent {
    fn default() -> Self {
        Self::new(SyncConfig::default())
    }
}

impl HousekeeperAgent {
    pub fn new(config: SyncConfig) -> Self {
        let (sync, _) = watch::channel(config);
        Self { sync }
    }

    pub fn sync_config(&self) -> SyncConfig {
        self.sync.borrow().clone()
    }

    /// Follow sync settings. The receiver sees every later update.
    pub fn subscribe(&self) -> watch::Receiver<SyncConfig> {
        self.sync.subscribe()
    }

    pub fn update_sync_config(&self, enabled: Option<bool>, folders: Option<Vec<String>>) {
        self.sync.send_modify(|config| {
            if let Some(enabled) = enabled {
                config.enabled = enabled;
            }
            if let Some(folders) = folders {
                config.folders = folders;
            }
        });
    }

    pub fn add_folder(&self, folder: &str) {
        self.sync.send_if_modified(|config| {
            if config.folders.iter().any(|f| f == folder) {
                return false;
            }
            config.folders.push(folder.to_string());
            true
        });
    }

    pub fn remove_folder(&self, folder: &str) {
        self.sync.send_modify(|config| config.folders.retain(|f| f != folder));
    }

    pub async fn trigger_sync(&self) -> SyncOutcome {
        if !self.sync.borrow().enabled {
            return SyncOutcome {
                success: false,
                message: "Sync is not enabled".to_string(),
            };
        }

        self.sync
            .send_modify(|config| config.sync_status = SyncStatus::Syncing);
        tokio::task::yield_now().await;

        let mut folders = 0;
        self.sync.send_modify(|config| {
            config.sync_status = SyncStatus::Success;
            config.last_sync = Some(now_millis());
            folders = config.folders.len();
        });
        info!(folders, "Folder sync finished");

        SyncOutcome {
            success: true,
            message: format!("Synced {folders} folders"),
        }
    }

    pub async fn backup_status(&self) -> Result<BackupStatus> {
        let workspace = self.sync.borrow().workspace.clone();
        backup::backup_status(&workspace).await
    }

    /// Commit and push the workspace. Git failures come back as an
    /// unsuccessful outcome rather than an error.
    pub async fn trigger_backup(&self) -> SyncOutcome {
        let workspace = self.sync.borrow().workspace.clone();
        let message = format!("Auto backup {}", now_millis());
        match backup::run_backup(&workspace, &message).await {
            Ok(message) => SyncOutcome {
                success: true,
                message,
            },
            Err(e) => {
                warn!(workspace = %workspace.display(), error = %e, "Backup failed");
                SyncOutcome {
                    success: false,
                    message: e.to_string(),
                }
            }
        }
    }

    /// Usage of the disk holding the workspace.
    pub fn disk_status(&self) -> Result<DiskStatus> {
        let workspace = self.sync.borrow().workspace.clone();
        let target = std::fs::canonicalize(&workspace).unwrap_or(workspace);
        let disks = Disks::new_with_refreshed_list();
        disks
            .list()
            .iter()
            .filter(|disk| target.starts_with(disk.mount_point()))
            .max_by_key(|disk| disk.mount_point().as_os_str().len())
            .map(|disk| {
                let (total, available) = (disk.total_space(), disk.available_space());
                DiskStatus::from_space(disk.mount_point(), total, available)
            })
            .ok_or_else(|| {
                LuxError::TaskFailed(format!("No disk found for {}", target.display()))
            })
    }

    pub fn cleanup_suggestions(&self) -> Vec<String> {
        [
            "Clear Next.js cache (.next folder) - potential 50-200MB",
            "Clear node_modules and reinstall - potential 500MB+",
            "Remove old log files - potential 10-50MB",
            "Clear browser cache for localhost",
        ]
        .into_iter()
        .map(String::from)
        .collect()
    }

    /// Estimate what a cleanup would free. Nothing is deleted.
    pub fn perform_cleanup(
        &self,
        clear_next_cache: bool,
        clear_logs: bool,
        clear_temp_files: bool,
    ) -> CleanupResult {
        let mut result = CleanupResult::default();
        let estimates = [
            (clear_next_cache, 100, 100 * MIB),
            (clear_logs, 10, 5 * MIB),
            (clear_temp_files, 20, 10 * MIB),
        ];
        for (_, files, bytes) in estimates.into_iter().filter(|(on, _, _)| *on) {
            result.files_removed += files;
            result.bytes_freed += bytes;
        }
        info!(
            files = result.files_removed,
            freed = %format_bytes(result.bytes_freed),
            "Cleanup estimated"
        );
        result
    }
}

#[async_trait]
impl TaskProcessor for HousekeeperAgent {
    type Task = HousekeeperTask;
    type Output = HousekeeperOutput;

    fn profile(&self) -> AgentProfile {
        AgentProfile::new(
            "housekeeper-agent",
            "Housekeeper Agent",
            "Keeps folders synced and suggests cleanups",
        )
        .with_capabilities(&[
            AgentCapability::FileSync,
            AgentCapability::Cleanup,
            AgentCapability::Backup,
        ])
    }

    async fn process_task(&self, task: &HousekeeperTask) -> Result<HousekeeperOutput> {
        let output = match task {
            HousekeeperTask::GetSyncConfig => HousekeeperOutput::Config(self.sync_config()),
            HousekeeperTask::UpdateSyncConfig { enabled, folders } => {
                self.update_sync_config(*enabled, folders.clone());
                HousekeeperOutput::Config(self.sync_config())
            }
            HousekeeperTask::AddFolder { folder } => {
                self.add_folder(folder);
                HousekeeperOutput::Config(self.sync_config())
            }
            HousekeeperTask::RemoveFolder { folder } => {
                self.remove_folder(folder);
                HousekeeperOutput::Config(self.sync_config())
            }
            HousekeeperTask::TriggerSync => HousekeeperOutput::Sync(self.trigger_sync().await),
            HousekeeperTask::GetBackupStatus => {
                HousekeeperOutput::Backup(self.backup_status().await?)
            }
            HousekeeperTask::TriggerBackup => HousekeeperOutput::Sync(self.trigger_backup().await),
            HousekeeperTask::GetDiskStatus => HousekeeperOutput::Disk(self.disk_status()?),
            HousekeeperTask::CleanupSuggestions => HousekeeperOutput::Suggestions {
                suggestions: self.cleanup_suggestions(),
            },
            HousekeeperTask::PerformCleanup {
                clear_next_cache,
                clear_logs,
                clear_temp_files,
            } => HousekeeperOutput::Cleanup(self.perform_cleanup(
                *clear_next_cache,
                *clear_logs,
                *clear_temp_files,
            )),
        };
        Ok(output)
    }
}

/// Human-readable byte count in powers of 1024, e.g. `1.5 KB`.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let fixed = format!("{value:.2}");
    let trimmed = fixed.trim_end_matches('0').trim_end_matches('.');
    format!("{trimmed} {}", UNITS[unit])
}
