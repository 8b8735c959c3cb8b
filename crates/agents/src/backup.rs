//! Git-backed workspace backups for the housekeeper.
//!
//! A workspace counts as backed up when it has no uncommitted changes and
//! every local commit has reached its upstream.

use luxrig_common::{LuxError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::process::Command;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupStatus {
    /// Unix millis of the newest commit
    pub last_commit: Option<u64>,
    /// Unix millis of the newest commit on the upstream branch
    pub last_push: Option<u64>,
    pub uncommitted_changes: usize,
    /// `None` when the branch has no upstream
    pub unpushed_commits: Option<usize>,
    pub needs_backup: bool,
}

/// Run git in `cwd` and return trimmed stdout.
async fn run_git(cwd: &Path, args: &[&str]) -> Result<String> {
    let output = Command::new("git")
        .current_dir(cwd)
        .args(args)
        .output()
        .await
        .map_err(|e| {
            LuxError::TaskFailed(format!(
                "failed to execute git {}: {e}",
                args.first().unwrap_or(&"")
            ))
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        return Err(LuxError::TaskFailed(format!(
            "git {} failed: {stderr}",
            args.join(" ")
        )));
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

fn parse_commit_time(stdout: &str) -> Option<u64> {
    stdout.parse::<u64>().ok().map(|secs| secs * 1000)
}

pub async fn backup_status(workspace: &Path) -> Result<BackupStatus> {
    let changes = run_git(workspace, &["status", "--porcelain"]).await?;
    let uncommitted_changes = changes.lines().filter(|l| !l.is_empty()).count();

    let last_commit = run_git(workspace, &["log", "-1", "--format=%ct"])
        .await
        .ok()
        .and_then(|out| parse_commit_time(&out));

    let (last_push, unpushed_commits) =
        match run_git(workspace, &["log", "-1", "--format=%ct", "@{upstream}"]).await {
            Ok(out) => {
                let ahead = run_git(workspace, &["rev-list", "--count", "@{upstream}..HEAD"])
                    .await?
                    .parse::<usize>()
                    .unwrap_or(0);
                (parse_commit_time(&out), Some(ahead))
            }
            Err(e) => {
                debug!(error = %e, "No upstream branch");
                (None, None)
            }
        };

    let needs_backup = uncommitted_changes > 0 || unpushed_commits != Some(0);
    Ok(BackupStatus {
        last_commit,
        last_push,
        uncommitted_changes,
        unpushed_commits,
        needs_backup,
    })
}

/// Commit every change and push it upstream.
///
/// Returns a human-readable summary of what was done.
pub async fn run_backup(workspace: &Path, message: &str) -> Result<String> {
    let status = backup_status(workspace).await?;
    if !status.needs_backup {
        return Ok("Nothing to back up".to_string());
    }

    let mut steps = Vec::new();
    if status.uncommitted_changes > 0 {
        run_git(workspace, &["add", "-A"]).await?;
        run_git(workspace, &["commit", "-m", message]).await?;
        steps.push(format!("committed {} changes", status.uncommitted_changes));
    }

    if status.unpushed_commits.is_none() {
        return Err(LuxError::TaskFailed(
            "no upstream branch configured, changes were committed locally only".to_string(),
        ));
    }
    run_git(workspace, &["push"]).await?;
    steps.push("pushed to upstream".to_string());

    info!(workspace = %workspace.display(), "Backup completed");
    Ok(format!("Backup completed: {}", steps.join(", ")))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use tempfile::TempDir;

    pub(crate) fn git_available() -> bool {
        std::process::Command::new("git")
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    pub(crate) async fn init_repo(dir: &Path) {
        run_git(dir, &["init", "-q"]).await.unwrap();
        run_git(dir, &["config", "user.name", "Housekeeper Test"]).await.unwrap();
        run_git(dir, &["config", "user.email", "housekeeper@example.com"]).await.unwrap();
    }

    #[test]
    fn commit_time_is_millis() {
        assert_eq!(parse_commit_time("1700000000"), Some(1_700_000_000_000));
        assert_eq!(parse_commit_time(""), None);
    }

    #[tokio::test]
    async fn status_outside_a_repo_fails() {
        if !git_available() {
            return;
        }
        let dir = TempDir::new().unwrap();
        assert!(backup_status(dir.path()).await.is_err());
    }

    #[tokio::test]
    async fn counts_uncommitted_changes() {
        if !git_available() {
            return;
        }
        let dir = TempDir::new().unwrap();
        init_repo(dir.path()).await;
        tokio::fs::write(dir.path().join("notes.md"), "draft").await.unwrap();

        let status = backup_status(dir.path()).await.unwrap();
        assert_eq!(status.uncommitted_changes, 1);
        assert!(status.last_commit.is_none());
        assert!(status.unpushed_commits.is_none());
        assert!(status.needs_backup);
    }

    #[tokio::test]
    async fn backup_pushes_to_upstream() {
        if !git_available() {
            return;
        }
        let remote = TempDir::new().unwrap();
        run_git(remote.path(), &["init", "-q", "--bare"]).await.unwrap();

        let dir = TempDir::new().unwrap();
        init_repo(dir.path()).await;
        tokio::fs::write(dir.path().join("a.txt"), "one").await.unwrap();
        run_git(dir.path(), &["add", "-A"]).await.unwrap();
        run_git(dir.path(), &["commit", "-q", "-m", "initial"]).await.unwrap();
        let remote_path = remote.path().to_string_lossy().to_string();
        run_git(dir.path(), &["remote", "add", "origin", &remote_path]).await.unwrap();
        run_git(dir.path(), &["push", "-q", "-u", "origin", "HEAD"]).await.unwrap();

        tokio::fs::write(dir.path().join("b.txt"), "two").await.unwrap();
        let summary = run_backup(dir.path(), "Auto backup").await.unwrap();
        assert!(summary.contains("committed 1 changes"));

        let status = backup_status(dir.path()).await.unwrap();
        assert_eq!(status.uncommitted_changes, 0);
        assert_eq!(status.unpushed_commits, Some(0));
        assert!(!status.needs_backup);
        assert_eq!(
            run_backup(dir.path(), "Auto backup").await.unwrap(),
            "Nothing to back up"
        );
    }

    #[tokio::test]
    async fn backup_without_upstream_commits_locally() {
        if !git_available() {
            return;
        }
        let dir = TempDir::new().unwrap();
        init_repo(dir.path()).await;
        tokio::fs::write(dir.path().join("a.txt"), "one").await.unwrap();

        let err = run_backup(dir.path(), "Auto backup").await.unwrap_err();
        assert!(err.to_string().contains("no upstream"));

        let status = backup_status(dir.path()).await.unwrap();
        assert_eq!(status.uncommitted_changes, 0);
        assert!(status.last_commit.is_some());
    }
}
