//! Configuration management.
//!
//! This module provides TOML-based configuration loading, parsing, and
//! validation.
//!
//! # Overview
//!
//! Configuration files support:
//! - Environment variable substitution (`${VAR_NAME}`)
//! - `NOTION_BACKUP_<SECTION>_<KEY>` environment overrides
//! - Default values for optional settings
//! - Secrets held in zeroizing, debug-redacted containers
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use notion_backup::config::load_config;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("notion-backup.toml")?;
//!
//! println!("Workspace: {}", config.notion.space_id);
//! println!("Storage: {}", config.storage.backend.as_str());
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration Structure
//!
//! - [`ApplicationConfig`] - Log level and dry-run switch
//! - [`NotionConfig`] - API host, workspace and session tokens
//! - [`ExportConfig`] - Export options and protocol timings
//! - [`StorageConfig`] - Local or rclone destination, retention
//! - [`NotificationConfig`] - Webhook dispatch
//! - [`RecoveryConfig`] - Recovery queue backing store
//! - [`LoggingConfig`] - Console and file logging
//!
//! # Example Configuration
//!
//! ```toml
//! [notion]
//! space_id = "0f1e2d3c-..."
//! token_v2 = "${NOTION_TOKEN_V2}"
//! file_token = "${NOTION_FILE_TOKEN}"
//!
//! [export]
//! export_type = "markdown"
//!
//! [storage]
//! backend = "local"
//! max_backups = 10
//!
//! [recovery]
//! host = "localhost"
//! ```

pub mod loader;
pub mod schema;
pub mod secret;

// Re-export commonly used types
pub use loader::{load_config, load_config_str, load_config_with_dry_run};
pub use schema::{
    ApplicationConfig, BackupConfig, ExportConfig, LocalStorageConfig, LoggingConfig,
    NotificationConfig, NotificationLevelFilter, NotionConfig, RcloneStorageConfig,
    RecoveryConfig, StorageBackendKind, StorageConfig,
};
pub use secret::{secret_string, secret_string_opt, SecretString, SecretValue};
