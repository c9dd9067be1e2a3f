// notion-backup - Notion workspace export backup tool
// Copyright (c) 2025 Notion Backup Contributors
// Licensed under the MIT License

//! # notion-backup - Notion Workspace Backups
//!
//! notion-backup requests a full workspace export through the internal task
//! queue used by the Notion web client, waits for it to finish, discovers
//! the download link in the activity feed, stores the archive and reports
//! the outcome.
//!
//! ## Overview
//!
//! This library provides the core functionality for:
//! - **Triggering** workspace exports and polling their task status
//! - **Matching** the export-completed activity by timestamp proximity
//! - **Downloading** the archive with a streaming SHA-256 checksum
//! - **Storing** archives locally or through rclone, with retention
//! - **Recovering** exports that completed but were never stored, on a later run
//!
//! ## Architecture
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Business logic (export orchestration, recovery queue)
//! - [`adapters`] - External integrations (Notion API, Redis, storage, webhooks)
//! - [`domain`] - Core domain types and models
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging and secret masking
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use notion_backup::config::load_config;
//! use notion_backup::core::export::ExportCoordinator;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = load_config("notion-backup.toml")?;
//!
//!     let mut coordinator = ExportCoordinator::new(config).await?;
//!     let summary = coordinator.run().await;
//!
//!     if let Some(artifact) = summary.artifact {
//!         println!("Stored {} at {}", artifact.file_name, artifact.location);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Recovery
//!
//! Once polling confirms that the platform finished an export, a failure in
//! matching, download or storage parks the task in a Redis list. The next
//! run drains that list before triggering a new export, so a completed
//! export is fetched instead of requested again:
//!
//! ```rust,no_run
//! use notion_backup::adapters::queue::MemoryListStore;
//! use notion_backup::core::recovery::RecoveryQueue;
//! use std::sync::Arc;
//!
//! # async fn example() {
//! let queue = RecoveryQueue::new(
//!     Some(Arc::new(MemoryListStore::new())),
//!     "notion_backup_recovery_queue",
//! );
//! for entry in queue.pending().await {
//!     println!("{} (attempt {})", entry.task_id, entry.retry_count);
//! }
//! # }
//! ```
//!
//! ## Error Handling
//!
//! All fallible library operations return [`domain::Result`], whose error
//! type classifies itself for retries and recovery:
//!
//! ```rust,no_run
//! use notion_backup::domain::BackupError;
//!
//! fn example() -> Result<(), BackupError> {
//!     let config = notion_backup::config::load_config("notion-backup.toml")?;
//!     Ok(())
//! }
//! ```
//!
//! ## Logging
//!
//! Structured logging uses the `tracing` crate. Tokens are never logged and
//! URLs pass through [`logging::mask_url`] first:
//!
//! ```rust,no_run
//! use notion_backup::logging::mask_url;
//!
//! let link = "https://file.notion.so/f/export.zip?signature=abc";
//! tracing::info!(link = %mask_url(link), "Downloading export");
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;
