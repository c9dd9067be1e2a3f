//! Notifier abstraction

use crate::domain::Result;
use async_trait::async_trait;
use serde::Serialize;

/// Severity attached to a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Success,
    Error,
}

impl NotificationLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationLevel::Success => "success",
            NotificationLevel::Error => "error",
        }
    }
}

/// Outbound channel for run outcomes
///
/// Callers treat every method as best-effort: an `Err` is logged, never
/// allowed to change the outcome of a backup.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_success(&self, title: &str, body: &str) -> Result<()>;

    async fn send_error(&self, title: &str, body: &str) -> Result<()>;

    /// Check the channel configuration, returning a short description
    async fn test_connection(&self) -> Result<String>;
}
