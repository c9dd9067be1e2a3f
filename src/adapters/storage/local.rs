//! Local filesystem storage

use super::traits::{
    is_backup_name, sort_newest_first, BackupEntry, BackupStorage, CleanupReport, StoredBackup,
};
use crate::config::LocalStorageConfig;
use crate::domain::{BackupError, Result};
use crate::logging::mask::mask_path;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

const PROBE_FILE: &str = ".test_write";

/// Keeps archives in a directory on the local machine
pub struct LocalStorage {
    path: PathBuf,
    prefix: String,
}

impl LocalStorage {
    /// Create the backend, creating the target directory if needed
    ///
    /// # Errors
    ///
    /// Returns `BackupError::Storage` if the directory cannot be created.
    pub fn new(config: &LocalStorageConfig, prefix: impl Into<String>) -> Result<Self> {
        let path = PathBuf::from(&config.path);
        std::fs::create_dir_all(&path).map_err(|e| {
            BackupError::Storage(format!(
                "Failed to create storage directory {}: {}",
                path.display(),
                e
            ))
        })?;

        tracing::info!(path = %path.display(), "Local storage initialized");
        Ok(Self {
            path,
            prefix: prefix.into(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn storage_error(context: &str, path: &Path, err: std::io::Error) -> BackupError {
    BackupError::Storage(format!("{} {}: {}", context, path.display(), err))
}

#[async_trait]
impl BackupStorage for LocalStorage {
    fn backend_name(&self) -> &'static str {
        "local"
    }

    async fn store(&self, file: &Path, destination_name: &str) -> Result<StoredBackup> {
        if !tokio::fs::try_exists(file).await.unwrap_or(false) {
            return Err(BackupError::Storage(format!(
                "Source file does not exist: {}",
                mask_path(&file.to_string_lossy())
            )));
        }

        let destination = self.path.join(destination_name);
        let size_bytes = tokio::fs::copy(file, &destination)
            .await
            .map_err(|e| storage_error("Failed to store file locally at", &destination, e))?;

        tracing::info!(
            location = %destination.display(),
            size_bytes,
            "File stored locally"
        );

        Ok(StoredBackup {
            location: destination.display().to_string(),
            size_bytes,
        })
    }

    async fn list_backups(&self) -> Result<Vec<BackupEntry>> {
        let mut dir = tokio::fs::read_dir(&self.path)
            .await
            .map_err(|e| storage_error("Failed to list", &self.path, e))?;

        let mut entries = Vec::new();
        while let Some(item) = dir
            .next_entry()
            .await
            .map_err(|e| storage_error("Failed to list", &self.path, e))?
        {
            let name = item.file_name().to_string_lossy().into_owned();
            if !is_backup_name(&name, &self.prefix) {
                continue;
            }
            let Ok(metadata) = item.metadata().await else {
                continue;
            };
            if !metadata.is_file() {
                continue;
            }
            let created = metadata
                .created()
                .or_else(|_| metadata.modified())
                .map(DateTime::<Utc>::from)
                .unwrap_or_else(|_| Utc::now());

            entries.push(BackupEntry {
                name,
                location: item.path().display().to_string(),
                size_bytes: metadata.len(),
                created,
            });
        }

        sort_newest_first(&mut entries);
        tracing::info!(count = entries.len(), "Found local backups");
        Ok(entries)
    }

    async fn cleanup_old(&self, keep: usize) -> Result<CleanupReport> {
        let backups = self.list_backups().await?;
        let mut report = CleanupReport {
            found: backups.len(),
            ..Default::default()
        };

        for backup in backups.iter().skip(keep) {
            match tokio::fs::remove_file(&backup.location).await {
                Ok(()) => {
                    report.removed += 1;
                    report.freed_bytes += backup.size_bytes;
                    tracing::info!(name = %backup.name, "Removed old backup");
                }
                Err(e) => {
                    tracing::warn!(name = %backup.name, error = %e, "Failed to remove old backup");
                    report.failed.push(backup.name.clone());
                }
            }
        }

        tracing::info!(message = %report.message(keep), "Local cleanup finished");
        Ok(report)
    }

    async fn test_connection(&self) -> Result<String> {
        let probe = self.path.join(PROBE_FILE);
        tokio::fs::write(&probe, b"test")
            .await
            .map_err(|e| storage_error("Local storage not writable at", &self.path, e))?;
        tokio::fs::remove_file(&probe)
            .await
            .map_err(|e| storage_error("Failed to remove probe file in", &self.path, e))?;

        Ok(format!("Local storage accessible at {}", self.path.display()))
    }
}
