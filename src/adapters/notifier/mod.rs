//! Run outcome notifications
//!
//! [`WebhookNotifier`] posts a JSON payload to every configured URL, filtered
//! by `notifications.level`.

pub mod traits;
pub mod webhook;

pub use traits::{NotificationLevel, Notifier};
pub use webhook::WebhookNotifier;

use crate::config::NotificationConfig;
use crate::domain::Result;
use std::sync::Arc;

/// Create the configured notifier
///
/// # Errors
///
/// Returns `BackupError::Notification` if the HTTP client cannot be built.
pub fn create_notifier(config: &NotificationConfig) -> Result<Arc<dyn Notifier + Send + Sync>> {
    Ok(Arc::new(WebhookNotifier::new(config)?) as Arc<dyn Notifier + Send + Sync>)
}
