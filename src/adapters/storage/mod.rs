//! Artifact storage backends
//!
//! Finished archives are handed to a [`BackupStorage`] implementation chosen
//! by `storage.backend`:
//!
//! - [`LocalStorage`] - a directory on the local machine
//! - [`RcloneStorage`] - any remote the `rclone` tool can reach

pub mod factory;
pub mod local;
pub mod rclone;
pub mod traits;

pub use factory::create_storage;
pub use local::LocalStorage;
pub use rclone::RcloneStorage;
pub use traits::{BackupEntry, BackupStorage, CleanupReport, StoredBackup};
