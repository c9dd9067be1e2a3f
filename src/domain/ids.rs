//! Domain identifier types with validation
//!
//! Newtype wrappers for the opaque identifiers handed out by the export
//! platform. Each type keeps task, activity and notification ids from being
//! mixed up at call sites.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Export task identifier newtype wrapper
///
/// Returned by the enqueue endpoint and used to poll task status.
///
/// # Examples
///
/// ```
/// use notion_backup::domain::ids::TaskId;
/// use std::str::FromStr;
///
/// let task_id = TaskId::from_str("5b0a3f3e-7d4c-4b7e-9a55-0e9d3c1f6a21").unwrap();
/// assert_eq!(task_id.as_str(), "5b0a3f3e-7d4c-4b7e-9a55-0e9d3c1f6a21");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    /// Creates a new TaskId from a string
    ///
    /// # Arguments
    ///
    /// * `id` - The task identifier string
    ///
    /// # Returns
    ///
    /// Returns `Ok(TaskId)` if the ID is valid, `Err` otherwise
    pub fn new(id: impl Into<String>) -> Result<Self, String> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err("Task ID cannot be empty".to_string());
        }
        Ok(Self(id))
    }

    /// Returns the task ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes self and returns the inner String
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TaskId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for TaskId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Activity record identifier from the notification feed
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActivityId(String);

impl ActivityId {
    /// Creates a new ActivityId. Feed ids are taken as-is.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the activity ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActivityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Notification record identifier, the target of read/archive updates
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationId(String);

impl NotificationId {
    /// Creates a new NotificationId
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the notification ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_id_valid() {
        let id = TaskId::new("abc-123").unwrap();
        assert_eq!(id.as_str(), "abc-123");
        assert_eq!(id.to_string(), "abc-123");
    }

    #[test]
    fn test_task_id_empty() {
        assert!(TaskId::new("").is_err());
        assert!(TaskId::new("   ").is_err());
    }

    #[test]
    fn test_task_id_serializes_as_plain_string() {
        let id = TaskId::new("t-1").unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"t-1\"");
        let back: TaskId = serde_json::from_str("\"t-1\"").unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_notification_id_display() {
        let id = NotificationId::new("n-42");
        assert_eq!(format!("{id}"), "n-42");
    }
}
