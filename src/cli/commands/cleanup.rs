//! Cleanup command implementation
//!
//! This module implements the `cleanup` command for applying retention by
//! hand.

use super::{load_for_command, EXIT_CONFIG_ERROR, EXIT_CONNECTION_ERROR, EXIT_SUCCESS};
use crate::adapters::storage::create_storage;
use clap::Args;

/// Arguments for the cleanup command
#[derive(Args, Debug, Clone)]
pub struct CleanupArgs {
    /// Number of newest backups to keep
    #[arg(short, long, default_value_t = 5)]
    pub keep: usize,
}

impl Default for CleanupArgs {
    fn default() -> Self {
        Self { keep: 5 }
    }
}

impl CleanupArgs {
    /// Execute the cleanup command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(keep = self.keep, "Cleaning up old backups");

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

        match storage.cleanup_old(self.keep).await {
            Ok(report) => {
                println!("🧹 {}", report.message(self.keep));
                for name in &report.failed {
                    println!("   ⚠️  Could not delete {name}");
                }
                Ok(EXIT_SUCCESS)
            }
            Err(e) => {
                tracing::error!(error = %e, "Cleanup failed");
                println!("❌ Cleanup failed");
                println!("   Error: {e}");
                Ok(EXIT_CONNECTION_ERROR)
            }
        }
    }
}
