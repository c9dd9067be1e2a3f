//! Core business logic for the backup tool.
//!
//! # Modules
//!
//! - [`export`] - Export protocol sequencing, matching, retries and summaries
//! - [`recovery`] - Recovery queue for exports confirmed but never stored
//!
//! # Backup Workflow
//!
//! 1. **Pre-flight**: Check that storage answers (and the notifier, if enabled)
//! 2. **Recovery**: Replay pending exports left by earlier runs
//! 3. **Trigger**: Enqueue a workspace export task
//! 4. **Poll**: Wait for the task to report success
//! 5. **Match**: Find the export-completed activity and its download link
//! 6. **Download**: Stream the archive to disk with a SHA-256 checksum
//! 7. **Store**: Hand the archive to the storage backend, apply retention
//! 8. **Notify**: Report the outcome
//!
//! # Example
//!
//! ```rust,no_run
//! use notion_backup::config::load_config;
//! use notion_backup::core::export::ExportCoordinator;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("notion-backup.toml")?;
//!
//! let mut coordinator = ExportCoordinator::new(config).await?;
//! let summary = coordinator.run().await;
//!
//! println!("Final phase: {}", summary.final_phase);
//! println!("Recovered: {}", summary.recovered);
//! # Ok(())
//! # }
//! ```

pub mod export;
pub mod recovery;
