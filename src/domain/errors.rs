//! Domain error types
//!
//! This module defines the error hierarchy for the backup tool.
//! All errors are domain-specific and don't expose third-party types.

use thiserror::Error;

/// Main backup error type
///
/// This is the primary error type used throughout the application.
/// It wraps specific error types and provides context for error handling.
#[derive(Debug, Error)]
pub enum BackupError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Export platform errors
    #[error("Notion error: {0}")]
    Notion(#[from] NotionError),

    /// Artifact download errors
    #[error("Download error: {0}")]
    Download(String),

    /// Storage backend errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Recovery queue backing store errors
    #[error("Recovery queue error: {0}")]
    Queue(String),

    /// Notification dispatch errors
    #[error("Notification error: {0}")]
    Notification(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// Generic errors with context
    #[error("{0}")]
    Other(String),
}

impl BackupError {
    /// Whether a phase-local retry loop may try the operation again.
    ///
    /// Only transient platform faults qualify. Rate limiting is a hard stop.
    pub fn is_retryable(&self) -> bool {
        matches!(self, BackupError::Notion(NotionError::Transient(_)))
    }

    /// Whether a failure after a confirmed task completion should be parked
    /// in the recovery queue for a later run.
    pub fn is_recovery_eligible(&self) -> bool {
        matches!(
            self,
            BackupError::Notion(NotionError::NoMatch(_))
                | BackupError::Notion(NotionError::RateLimited(_))
                | BackupError::Download(_)
                | BackupError::Storage(_)
                | BackupError::Io(_)
        )
    }
}

/// Export platform errors
///
/// Errors that occur while talking to the workspace export API.
/// These errors don't expose third-party HTTP client types.
#[derive(Debug, Error)]
pub enum NotionError {
    /// HTTP 429 from the platform, never retried
    #[error("Rate limit exceeded during {0}")]
    RateLimited(String),

    /// Timeouts, connection errors and non-200 responses other than 429
    #[error("Transient failure: {0}")]
    Transient(String),

    /// The platform reported the export task as failed
    #[error("Export task {0} failed on the platform")]
    TaskFailed(String),

    /// The export task did not reach a terminal state in time
    #[error("Export task {task_id} did not complete within {seconds} seconds")]
    TaskTimeout { task_id: String, seconds: u64 },

    /// The activity feed never yielded a correlating completion record
    #[error("No matching export-completed activity: {0}")]
    NoMatch(String),

    /// Response body could not be interpreted
    #[error("Invalid response from platform: {0}")]
    InvalidResponse(String),
}

// Conversion from std::io::Error
impl From<std::io::Error> for BackupError {
    fn from(err: std::io::Error) -> Self {
        BackupError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for BackupError {
    fn from(err: serde_json::Error) -> Self {
        BackupError::Serialization(err.to_string())
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for BackupError {
    fn from(err: toml::de::Error) -> Self {
        BackupError::Configuration(format!("TOML parse error: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backup_error_display() {
        let err = BackupError::Configuration("Invalid config".to_string());
        assert_eq!(err.to_string(), "Configuration error: Invalid config");
    }

    #[test]
    fn test_notion_error_conversion() {
        let notion_err = NotionError::TaskFailed("task-1".to_string());
        let err: BackupError = notion_err.into();
        assert!(matches!(err, BackupError::Notion(NotionError::TaskFailed(_))));
        assert!(err.to_string().contains("task-1"));
    }

    #[test]
    fn test_only_transient_is_retryable() {
        assert!(BackupError::from(NotionError::Transient("503".into())).is_retryable());
        assert!(!BackupError::from(NotionError::RateLimited("enqueue".into())).is_retryable());
        assert!(!BackupError::from(NotionError::TaskFailed("t".into())).is_retryable());
        assert!(!BackupError::Download("reset".into()).is_retryable());
    }

    #[test]
    fn test_recovery_eligibility() {
        assert!(BackupError::from(NotionError::NoMatch("none".into())).is_recovery_eligible());
        assert!(BackupError::Download("reset".into()).is_recovery_eligible());
        assert!(BackupError::Storage("disk full".into()).is_recovery_eligible());
        assert!(!BackupError::from(NotionError::TaskFailed("t".into())).is_recovery_eligible());
        assert!(!BackupError::Configuration("bad".into()).is_recovery_eligible());
    }

    #[test]
    fn test_task_timeout_message() {
        let err = NotionError::TaskTimeout {
            task_id: "abc".to_string(),
            seconds: 1200,
        };
        assert_eq!(
            err.to_string(),
            "Export task abc did not complete within 1200 seconds"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let err: BackupError = io_err.into();
        assert!(matches!(err, BackupError::Io(_)));
    }

    #[test]
    fn test_serde_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let err: BackupError = json_err.into();
        assert!(matches!(err, BackupError::Serialization(_)));
    }

    #[test]
    fn test_toml_error_conversion() {
        let toml_err = toml::from_str::<toml::Value>("invalid = toml = syntax").unwrap_err();
        let err: BackupError = toml_err.into();
        assert!(matches!(err, BackupError::Configuration(_)));
        assert!(err.to_string().contains("TOML parse error"));
    }
}
