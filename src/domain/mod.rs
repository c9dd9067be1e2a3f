//! Domain models and types for the backup tool.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Strongly-typed identifiers** ([`TaskId`], [`ActivityId`], [`NotificationId`])
//! - **Export data model** ([`ExportTask`], [`FeedSnapshot`], [`PendingRecovery`])
//! - **Error types** ([`BackupError`], [`NotionError`])
//! - **Result type alias** ([`Result`])
//!
//! # Error Handling
//!
//! All fallible operations return [`Result<T, BackupError>`]. Errors carry
//! their own classification so callers can decide between retrying,
//! queueing for recovery, or failing the run:
//!
//! ```rust
//! use notion_backup::domain::{BackupError, NotionError};
//!
//! let err: BackupError = NotionError::NoMatch("feed exhausted".into()).into();
//! assert!(err.is_recovery_eligible());
//! assert!(!err.is_retryable());
//! ```

pub mod errors;
pub mod export;
pub mod ids;
pub mod result;

// Re-export commonly used types for convenience
pub use errors::{BackupError, NotionError};
pub use export::{
    ActivityKind, ActivityRecord, ExportPhase, ExportTask, ExportType, FeedSnapshot,
    NotificationAction, NotificationRecord, PendingRecovery, EXPORT_COMPLETED,
    MAX_RECOVERY_ATTEMPTS,
};
pub use ids::{ActivityId, NotificationId, TaskId};
pub use result::Result;
