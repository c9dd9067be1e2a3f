//! Validate config command implementation
//!
//! This module implements the `validate-config` command for validating
//! the configuration file.

use super::{load_for_command, EXIT_CONFIG_ERROR, EXIT_SUCCESS};
use crate::config::StorageBackendKind;
use crate::logging::mask_url;
use clap::Args;

/// Arguments for the validate-config command
#[derive(Args, Debug, Clone, Default)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    pub async fn execute(&self, config_path: &str, dry_run: bool) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        let Some(config) = load_for_command(config_path, dry_run) else {
            return Ok(EXIT_CONFIG_ERROR);
        };

        println!("✅ Configuration is valid");
        println!();
        println!("Configuration Summary:");
        println!("  Log Level: {}", config.application.log_level);
        println!("  Dry Run: {}", config.application.dry_run);
        println!("  API Host: {}", mask_url(&config.notion.base_url));
        println!("  Workspace: {}", config.notion.space_id);
        println!(
            "  Export: {}{}",
            config.export.export_type,
            if config.export.flatten_export_filetree {
                " (flattened)"
            } else {
                ""
            }
        );
        println!(
            "  Notification Action: {}",
            config.export.notification_action.as_str()
        );

        match config.storage.backend {
            StorageBackendKind::Local => {
                println!("  Storage: local ({})", config.storage.local.path);
            }
            StorageBackendKind::Rclone => {
                if let Some(ref rclone) = config.storage.rclone {
                    println!("  Storage: rclone ({}:{})", rclone.remote, rclone.path);
                }
            }
        }
        match config.storage.max_backups {
            Some(keep) => println!("  Retention: keep {keep}"),
            None => println!("  Retention: unlimited"),
        }

        println!(
            "  Notifications: {}",
            if config.notifications.enabled {
                format!("{} endpoint(s)", config.notifications.urls.len())
            } else {
                "disabled".to_string()
            }
        );
        println!(
            "  Recovery Queue: {}",
            if config.recovery.is_enabled() {
                config.recovery.display_url()
            } else {
                "disabled".to_string()
            }
        );
        println!();

        Ok(EXIT_SUCCESS)
    }
}
