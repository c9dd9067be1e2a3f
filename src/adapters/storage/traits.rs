//! Storage abstraction traits
//!
//! This module defines the trait that artifact storage backends must
//! implement to receive finished export archives.

use crate::domain::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::Path;

/// Outcome of a successful store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBackup {
    /// Where the archive ended up, in backend terms
    pub location: String,
    pub size_bytes: u64,
}

/// One archive held by a backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupEntry {
    pub name: String,
    pub location: String,
    pub size_bytes: u64,
    pub created: DateTime<Utc>,
}

/// Outcome of a retention pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    /// Archives found before cleanup
    pub found: usize,
    pub removed: usize,
    pub freed_bytes: u64,
    /// Archives that could not be removed
    pub failed: Vec<String>,
}

impl CleanupReport {
    pub fn message(&self, keep: usize) -> String {
        if self.found <= keep {
            format!(
                "No cleanup needed. Found {} backups, keeping {}",
                self.found, keep
            )
        } else {
            format!(
                "Cleaned up {} old backups, freed {} bytes",
                self.removed, self.freed_bytes
            )
        }
    }
}

/// Destination for finished export archives
///
/// All methods report backend failures as `BackupError::Storage`.
#[async_trait]
pub trait BackupStorage: Send + Sync {
    /// Short backend name used in logs and notifications
    fn backend_name(&self) -> &'static str;

    /// Copy `file` into the backend under `destination_name`
    async fn store(&self, file: &Path, destination_name: &str) -> Result<StoredBackup>;

    /// Archives produced by this tool, newest first
    async fn list_backups(&self) -> Result<Vec<BackupEntry>>;

    /// Delete all but the `keep` newest archives
    ///
    /// Individual delete failures are recorded in the report rather than
    /// failing the whole pass.
    async fn cleanup_old(&self, keep: usize) -> Result<CleanupReport>;

    /// Check that the backend is reachable and writable
    ///
    /// Returns a short description of the backend on success.
    async fn test_connection(&self) -> Result<String>;
}

/// Whether `name` looks like an archive written with `prefix`
pub fn is_backup_name(name: &str, prefix: &str) -> bool {
    name.strip_prefix(prefix)
        .is_some_and(|rest| rest.starts_with('-') && rest.ends_with(".zip"))
}

/// Newest first, with name as a tie-breaker
pub fn sort_newest_first(entries: &mut [BackupEntry]) {
    entries.sort_by(|a, b| b.created.cmp(&a.created).then_with(|| b.name.cmp(&a.name)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use test_case::test_case;

    #[test_case("notion-export-markdown_2025-01-01_00-00-00.zip", true)]
    #[test_case("notion-export-html-flattened_2025-01-01_00-00-00.zip", true)]
    #[test_case("notion-export.zip", false)]
    #[test_case("notion-exporter-x.zip", false)]
    #[test_case("notion-export-markdown.tar", false)]
    #[test_case("other-markdown.zip", false)]
    fn test_is_backup_name(name: &str, expected: bool) {
        assert_eq!(is_backup_name(name, "notion-export"), expected);
    }

    #[test]
    fn test_sort_newest_first() {
        let at = |d| Utc.with_ymd_and_hms(2025, 1, d, 0, 0, 0).unwrap();
        let entry = |name: &str, d| BackupEntry {
            name: name.to_string(),
            location: name.to_string(),
            size_bytes: 1,
            created: at(d),
        };
        let mut entries = vec![entry("a", 1), entry("c", 3), entry("b", 2)];
        sort_newest_first(&mut entries);
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["c", "b", "a"]);
    }

    #[test]
    fn test_cleanup_message() {
        let report = CleanupReport {
            found: 3,
            ..Default::default()
        };
        assert_eq!(report.message(5), "No cleanup needed. Found 3 backups, keeping 5");

        let report = CleanupReport {
            found: 7,
            removed: 2,
            freed_bytes: 2048,
            failed: vec![],
        };
        assert_eq!(report.message(5), "Cleaned up 2 old backups, freed 2048 bytes");
    }
}
