//! Backup command implementation
//!
//! This module implements the `backup` command, the default when no
//! subcommand is given.

use super::{load_for_command, EXIT_BACKUP_FAILED, EXIT_CONFIG_ERROR, EXIT_FATAL, EXIT_SUCCESS};
use crate::core::export::artifact::format_file_size;
use crate::core::export::{ExportCoordinator, RunSummary};
use crate::domain::BackupError;
use clap::Args;

/// Arguments for the backup command
#[derive(Args, Debug, Clone, Default)]
pub struct BackupArgs {}

impl BackupArgs {
    /// Execute the backup command
    pub async fn execute(&self, config_path: &str, dry_run: bool) -> anyhow::Result<i32> {
        tracing::info!("Starting backup command");

        let Some(config) = load_for_command(config_path, dry_run) else {
            return Ok(EXIT_CONFIG_ERROR);
        };

        if config.application.dry_run {
            println!("🔍 DRY RUN MODE - the platform will not be contacted");
            println!();
        }

        let mut coordinator = match ExportCoordinator::new(config).await {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(error = %e, "Failed to initialize backup");
                println!("❌ Failed to initialize backup");
                println!("   Error: {e}");
                return Ok(match e {
                    BackupError::Configuration(_) => EXIT_CONFIG_ERROR,
                    _ => EXIT_FATAL,
                });
            }
        };

        let summary = coordinator.run().await;
        print_summary(&summary);

        Ok(if summary.is_successful() {
            EXIT_SUCCESS
        } else {
            EXIT_BACKUP_FAILED
        })
    }
}

fn print_summary(summary: &RunSummary) {
    println!();
    if summary.is_successful() {
        println!("✅ Backup completed");
    } else {
        println!("❌ Backup failed");
    }
    println!();

    if let Some(ref task_id) = summary.task_id {
        println!("  Task ID: {task_id}");
    }
    if let Some(ref artifact) = summary.artifact {
        println!("  File: {}", artifact.file_name);
        println!("  Size: {}", format_file_size(artifact.size_bytes));
        println!("  SHA-256: {}", artifact.sha256);
        println!("  Location: {}", artifact.location);
    }
    if summary.slow_completion {
        println!("  ⚠️  The export took more than five minutes to appear in the feed");
    }
    if summary.recovered + summary.requeued + summary.discarded > 0 {
        println!(
            "  Recovery: {} recovered, {} queued, {} discarded",
            summary.recovered, summary.requeued, summary.discarded
        );
    }
    if let Some(ref error) = summary.error {
        if let Some(phase) = summary.failed_phase {
            println!("  Failed phase: {phase}");
        }
        println!("  Error: {error}");
    }
    println!("  Duration: {:.1}s", summary.duration.as_secs_f64());
    println!();
}
