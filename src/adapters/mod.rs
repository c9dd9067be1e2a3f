//! External system integrations
//!
//! This module provides adapters for integrating with external systems:
//!
//! - [`notion`] - Export platform API (task queue, notification feed, downloads)
//! - [`queue`] - Recovery queue backing stores (Redis, in-memory)
//! - [`storage`] - Archive destinations (local directory, rclone remote)
//! - [`notifier`] - Webhook notifications
//!
//! # Design Pattern
//!
//! Adapters follow the **Adapter Pattern** to isolate external dependencies
//! and enable testing with mock implementations. Storage, notification and
//! queue backends sit behind traits and are selected from configuration.
//!
//! ```rust,no_run
//! use notion_backup::adapters::storage::create_storage;
//! use notion_backup::config::load_config;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("notion-backup.toml")?;
//! let storage = create_storage(&config)?;
//! for backup in storage.list_backups().await? {
//!     println!("{} ({} bytes)", backup.name, backup.size_bytes);
//! }
//! # Ok(())
//! # }
//! ```

pub mod notifier;
pub mod notion;
pub mod queue;
pub mod storage;
