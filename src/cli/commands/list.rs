//! List command implementation
//!
//! This module implements the `list` command for showing stored backups.

use super::{load_for_command, EXIT_CONFIG_ERROR, EXIT_CONNECTION_ERROR, EXIT_SUCCESS};
use crate::adapters::storage::create_storage;
use crate::core::export::artifact::format_file_size;
use clap::Args;

/// Arguments for the list command
#[derive(Args, Debug, Clone, Default)]
pub struct ListArgs {}

impl ListArgs {
    /// Execute the list command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!("Listing backups");

        // Listing never touches the platform, so credentials are optional here.
        let Some(config) = load_for_command(config_path, true) else {
            return Ok(EXIT_CONFIG_ERROR);
        };

        let storage = match create_storage(&config) {
            Ok(s) => s,
            Err(e) => {
                println!("❌ Failed to initialize storage");
                println!("   Error: {e}");
                return Ok(EXIT_CONFIG_ERROR);
            }
        };

        let backups = match storage.list_backups().await {
            Ok(b) => b,
            Err(e) => {
                tracing::error!(error = %e, "Failed to list backups");
                println!("❌ Failed to list backups");
                println!("   Error: {e}");
                return Ok(EXIT_CONNECTION_ERROR);
            }
        };

        println!("📦 Backups ({})", storage.backend_name());
        println!();

        if backups.is_empty() {
            println!("No backups found.");
            return Ok(EXIT_SUCCESS);
        }

        println!("{:<60} {:>10}  {:<20}", "Name", "Size", "Created (UTC)");
        println!("{}", "-".repeat(94));
        for backup in &backups {
            println!(
                "{:<60} {:>10}  {:<20}",
                backup.name,
                format_file_size(backup.size_bytes),
                backup.created.format("%Y-%m-%d %H:%M:%S")
            );
        }
        println!();
        println!("Total: {} backups", backups.len());

        Ok(EXIT_SUCCESS)
    }
}
