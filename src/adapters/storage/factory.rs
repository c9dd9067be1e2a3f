//! Storage backend factory
//!
//! This module provides the factory function that creates a storage backend
//! based on configuration.

use super::local::LocalStorage;
use super::rclone::RcloneStorage;
use super::traits::BackupStorage;
use crate::config::{BackupConfig, StorageBackendKind};
use crate::domain::{BackupError, Result};
use std::sync::Arc;

/// Create a storage backend based on the configuration
///
/// # Arguments
///
/// * `config` - The backup configuration
///
/// # Returns
///
/// Returns an Arc-wrapped trait object that implements BackupStorage
///
/// # Errors
///
/// Returns an error if the backend cannot be created, for example when the
/// local directory cannot be created or the rclone section is missing.
pub fn create_storage(config: &BackupConfig) -> Result<Arc<dyn BackupStorage + Send + Sync>> {
    let prefix = config.export.filename_prefix.clone();

    match config.storage.backend {
        StorageBackendKind::Local => {
            tracing::info!("Creating local storage backend");
            let storage = LocalStorage::new(&config.storage.local, prefix)?;
            Ok(Arc::new(storage) as Arc<dyn BackupStorage + Send + Sync>)
        }
        StorageBackendKind::Rclone => {
            let rclone = config.storage.rclone.as_ref().ok_or_else(|| {
                BackupError::Configuration(
                    "storage.rclone section is required when backend is 'rclone'".to_string(),
                )
            })?;

            tracing::info!("Creating rclone storage backend");
            let storage = RcloneStorage::new(rclone, prefix);
            Ok(Arc::new(storage) as Arc<dyn BackupStorage + Send + Sync>)
        }
    }
}
