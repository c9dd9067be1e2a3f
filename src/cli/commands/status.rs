//! Status command implementation
//!
//! This module implements the `status` command for displaying exports
//! waiting in the recovery queue. The queue is read, never drained.

use super::{load_for_command, EXIT_CONFIG_ERROR, EXIT_CONNECTION_ERROR, EXIT_SUCCESS};
use crate::adapters::queue::connect_list_store;
use crate::core::recovery::RecoveryQueue;
use crate::domain::{TaskId, MAX_RECOVERY_ATTEMPTS};
use chrono::{TimeZone, Utc};
use clap::Args;

/// Arguments for the status command
#[derive(Args, Debug, Clone, Default)]
pub struct StatusArgs {
    /// Drop every pending entry for this task before listing
    #[arg(long, value_name = "TASK_ID")]
    pub remove: Option<String>,
}

impl StatusArgs {
    /// Execute the status command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!("Checking recovery queue status");

        println!("📊 Recovery Queue Status");
        println!();

        let Some(config) = load_for_command(config_path, true) else {
            return Ok(EXIT_CONFIG_ERROR);
        };

        if !config.recovery.is_enabled() {
            println!("Recovery queue is not configured.");
            println!("Set [recovery] host to enable recovery of interrupted exports.");
            return Ok(EXIT_SUCCESS);
        }

        let Some(store) = connect_list_store(&config.recovery).await else {
            println!("❌ Failed to connect to {}", config.recovery.display_url());
            return Ok(EXIT_CONNECTION_ERROR);
        };
        let queue = RecoveryQueue::new(Some(store), config.recovery.queue_key.clone());

        if let Some(ref raw_id) = self.remove {
            let task_id = match TaskId::new(raw_id.as_str()) {
                Ok(id) => id,
                Err(e) => {
                    println!("❌ Invalid task ID: {e}");
                    return Ok(EXIT_CONFIG_ERROR);
                }
            };
            if queue.remove(&task_id).await {
                println!("🗑️  Removed pending entries for {task_id}");
            } else {
                println!("❌ Failed to remove pending entries for {task_id}");
                return Ok(EXIT_CONNECTION_ERROR);
            }
            println!();
        }

        let pending = queue.pending().await;
        if pending.is_empty() {
            println!("No pending exports.");
            return Ok(EXIT_SUCCESS);
        }

        println!("{:<40} {:<22} {:>8}", "Task ID", "Enqueued (UTC)", "Attempts");
        println!("{}", "-".repeat(72));
        for entry in &pending {
            let enqueued = Utc
                .timestamp_millis_opt(entry.enqueued_at)
                .single()
                .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_else(|| entry.enqueued_at.to_string());
            println!(
                "{:<40} {:<22} {:>5}/{}",
                entry.task_id.as_str(),
                enqueued,
                entry.retry_count,
                MAX_RECOVERY_ATTEMPTS
            );
        }
        println!();
        println!("Total: {} pending exports", pending.len());

        Ok(EXIT_SUCCESS)
    }
}
