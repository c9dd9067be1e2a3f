//! Remote storage through the `rclone` command-line tool
//!
//! Every operation shells out to the configured `rclone` binary. Command
//! lines are logged with the `--config` path reduced to its file name.

use super::traits::{
    is_backup_name, sort_newest_first, BackupEntry, BackupStorage, CleanupReport, StoredBackup,
};
use crate::config::RcloneStorageConfig;
use crate::domain::{BackupError, Result};
use crate::logging::mask::mask_path;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::path::Path;
use tokio::process::Command;

/// Entry printed by `rclone lsjson`
#[derive(Debug, Deserialize)]
struct LsJsonEntry {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Size", default)]
    size: i64,
    #[serde(rename = "ModTime", default)]
    mod_time: String,
    #[serde(rename = "IsDir", default)]
    is_dir: bool,
}

pub struct RcloneStorage {
    binary: String,
    remote: String,
    remote_path: String,
    config_path: Option<String>,
    additional_args: Vec<String>,
    keep_local: bool,
    prefix: String,
}

impl RcloneStorage {
    pub fn new(config: &RcloneStorageConfig, prefix: impl Into<String>) -> Self {
        tracing::info!(
            remote = %config.remote,
            path = %config.path,
            "Rclone storage initialized"
        );
        Self {
            binary: config.binary.clone(),
            remote: config.remote.clone(),
            remote_path: config.path.clone(),
            config_path: config.config_path.clone(),
            additional_args: config.additional_args.clone(),
            keep_local: config.keep_local,
            prefix: prefix.into(),
        }
    }

    /// `remote:path`, the directory archives are copied into
    fn remote_dir(&self) -> String {
        format!("{}:{}", self.remote, self.remote_path)
    }

    /// Arguments for one invocation, binary excluded
    fn build_args(&self, operation: &str, args: &[&str]) -> Vec<String> {
        let mut cmd = vec![operation.to_string()];
        if let Some(ref config_path) = self.config_path {
            cmd.push("--config".to_string());
            cmd.push(config_path.clone());
        }
        cmd.extend(args.iter().map(|a| a.to_string()));
        cmd.extend(self.additional_args.iter().cloned());
        cmd
    }

    /// Command line safe to log
    fn masked_command(&self, args: &[String]) -> String {
        let mut parts = vec![self.binary.clone()];
        let mut mask_next = false;
        for arg in args {
            if mask_next {
                parts.push(mask_path(arg));
                mask_next = false;
            } else {
                mask_next = arg == "--config";
                parts.push(arg.clone());
            }
        }
        parts.join(" ")
    }

    /// Run rclone and return trimmed stdout
    async fn run(&self, operation: &str, args: &[&str]) -> Result<String> {
        let args = self.build_args(operation, args);
        let masked = self.masked_command(&args);
        tracing::debug!(command = %masked, "Running rclone");

        let output = Command::new(&self.binary)
            .args(&args)
            .output()
            .await
            .map_err(|e| BackupError::Storage(format!("Failed to run rclone: {e}")))?;

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if output.status.success() {
            if operation == "lsjson" {
                tracing::debug!(output = %stdout, "Rclone command succeeded");
            } else {
                tracing::debug!(operation, "Rclone command succeeded");
            }
            return Ok(stdout);
        }

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let code = output
            .status
            .code()
            .map_or_else(|| "signal".to_string(), |c| c.to_string());
        tracing::error!(command = %masked, code = %code, stderr = %stderr, "Rclone command failed");
        Err(BackupError::Storage(format!(
            "rclone {operation} failed with code {code}: {stderr}"
        )))
    }
}

/// Lines of `rclone about` worth reporting
fn summarize_about(output: &str) -> String {
    output
        .lines()
        .map(str::trim)
        .filter(|line| {
            line.starts_with("Total:") || line.starts_with("Used:") || line.starts_with("Free:")
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[async_trait]
impl BackupStorage for RcloneStorage {
    fn backend_name(&self) -> &'static str {
        "rclone"
    }

    async fn store(&self, file: &Path, destination_name: &str) -> Result<StoredBackup> {
        let metadata = tokio::fs::metadata(file).await.map_err(|e| {
            BackupError::Storage(format!(
                "Source file {} is not readable: {}",
                mask_path(&file.to_string_lossy()),
                e
            ))
        })?;

        let remote_dir = self.remote_dir();
        let source = file.to_string_lossy();
        self.run("copy", &[source.as_ref(), remote_dir.as_str()]).await?;

        let location = format!("{remote_dir}/{destination_name}");
        tracing::info!(location = %location, size_bytes = metadata.len(), "File uploaded");

        if !self.keep_local {
            match tokio::fs::remove_file(file).await {
                Ok(()) => tracing::info!(file = %mask_path(&source), "Removed local file"),
                Err(e) => tracing::warn!(error = %e, "Failed to remove local file"),
            }
        }

        Ok(StoredBackup {
            location,
            size_bytes: metadata.len(),
        })
    }

    async fn list_backups(&self) -> Result<Vec<BackupEntry>> {
        let remote_dir = self.remote_dir();
        let output = self.run("lsjson", &[remote_dir.as_str()]).await?;
        if output.is_empty() {
            return Ok(Vec::new());
        }

        let listing: Vec<LsJsonEntry> = serde_json::from_str(&output)
            .map_err(|e| BackupError::Storage(format!("Unreadable rclone listing: {e}")))?;

        let mut entries: Vec<BackupEntry> = listing
            .into_iter()
            .filter(|item| !item.is_dir && is_backup_name(&item.name, &self.prefix))
            .map(|item| BackupEntry {
                location: format!("{}/{}", remote_dir, item.name),
                size_bytes: item.size.max(0) as u64,
                created: DateTime::parse_from_rfc3339(&item.mod_time)
                    .map(|t| t.with_timezone(&Utc))
                    .unwrap_or_else(|_| Utc::now()),
                name: item.name,
            })
            .collect();

        sort_newest_first(&mut entries);
        tracing::info!(count = entries.len(), "Found remote backups");
        Ok(entries)
    }

    async fn cleanup_old(&self, keep: usize) -> Result<CleanupReport> {
        let backups = self.list_backups().await?;
        let mut report = CleanupReport {
            found: backups.len(),
            ..Default::default()
        };

        for backup in backups.iter().skip(keep) {
            match self.run("delete", &[backup.location.as_str()]).await {
                Ok(_) => {
                    report.removed += 1;
                    report.freed_bytes += backup.size_bytes;
                    tracing::info!(name = %backup.name, "Removed old remote backup");
                }
                Err(e) => {
                    tracing::warn!(name = %backup.name, error = %e, "Failed to remove remote backup");
                    report.failed.push(backup.name.clone());
                }
            }
        }

        tracing::info!(message = %report.message(keep), "Remote cleanup finished");
        Ok(report)
    }

    async fn test_connection(&self) -> Result<String> {
        let root = format!("{}:", self.remote);
        let about_err = match self.run("about", &[root.as_str()]).await {
            Ok(output) => {
                let summary = summarize_about(&output);
                return Ok(if summary.is_empty() {
                    format!("Rclone remote '{}' is accessible", self.remote)
                } else {
                    format!("Rclone remote '{}' is accessible ({})", self.remote, summary)
                });
            }
            Err(e) => e,
        };

        // Some backends do not implement `about`.
        if !self.remote_path.is_empty() {
            let remote_dir = self.remote_dir();
            if self.run("mkdir", &[remote_dir.as_str()]).await.is_ok() {
                return Ok(format!(
                    "Rclone remote '{}' and backup path '{}' are accessible",
                    self.remote, self.remote_path
                ));
            }
        }

        Err(BackupError::Storage(format!(
            "Rclone remote '{}' is not accessible: {}",
            self.remote, about_err
        )))
    }
}
