//! CLI command implementations
//!
//! This module contains all CLI command implementations. Each command's
//! `execute` returns the process exit code.

pub mod backup;
pub mod cleanup;
pub mod init;
pub mod list;
pub mod status;
pub mod validate;

use crate::config::{load_config_with_dry_run, BackupConfig};

/// Exit code for a successful command
pub const EXIT_SUCCESS: i32 = 0;
/// Exit code for a backup run that ended in `Failed`
pub const EXIT_BACKUP_FAILED: i32 = 1;
/// Exit code for configuration errors
pub const EXIT_CONFIG_ERROR: i32 = 2;
/// Exit code for failed connectivity checks
pub const EXIT_CONNECTION_ERROR: i32 = 4;
/// Exit code for anything else
pub const EXIT_FATAL: i32 = 5;

/// Load and validate configuration for a command, printing the failure
fn load_for_command(config_path: &str, dry_run: bool) -> Option<BackupConfig> {
    match load_config_with_dry_run(config_path, dry_run) {
        Ok(config) => Some(config),
        Err(e) => {
            tracing::error!(config_path = %config_path, error = %e, "Failed to load configuration");
            println!("❌ Failed to load configuration file: {config_path}");
            println!("   Error: {e}");
            None
        }
    }
}
