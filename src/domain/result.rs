//! Result type alias for the backup tool
//!
//! This module provides a convenient Result type alias that uses BackupError
//! as the error type.

use super::errors::BackupError;

/// Result type alias for backup operations
///
/// This is a convenience type alias that uses `BackupError` as the error type.
/// Use this throughout the codebase for fallible operations.
///
/// # Examples
///
/// ```
/// use notion_backup::domain::result::Result;
/// use notion_backup::domain::errors::BackupError;
///
/// fn example_function() -> Result<String> {
///     Ok("success".to_string())
/// }
///
/// fn failing_function() -> Result<()> {
///     Err(BackupError::Storage("destination unavailable".to_string()))
/// }
/// ```
pub type Result<T> = std::result::Result<T, BackupError>;
