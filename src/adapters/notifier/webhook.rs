//! Multi-channel webhook dispatch
//!
//! Every configured URL receives the same JSON payload:
//!
//! ```json
//! {"title": "Notion Backup: Backup Completed", "body": "...", "level": "success", "timestamp": "2025-01-01T00:00:00Z"}
//! ```

use super::traits::{NotificationLevel, Notifier};
use crate::config::{NotificationConfig, NotificationLevelFilter};
use crate::domain::{BackupError, Result};
use crate::logging::mask::mask_url;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    title: String,
    body: &'a str,
    level: NotificationLevel,
    timestamp: String,
}

pub struct WebhookNotifier {
    http: Client,
    config: NotificationConfig,
}

impl WebhookNotifier {
    /// # Errors
    ///
    /// Returns `BackupError::Notification` if the HTTP client cannot be built.
    pub fn new(config: &NotificationConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| BackupError::Notification(format!("Failed to build HTTP client: {e}")))?;

        let masked: Vec<String> = config.urls.iter().map(|u| mask_url(u)).collect();
        tracing::info!(
            enabled = config.enabled,
            endpoints = config.urls.len(),
            "Webhook notifier initialized"
        );
        tracing::debug!(urls = ?masked, "Notification URLs (masked)");

        Ok(Self {
            http,
            config: config.clone(),
        })
    }

    fn urls(&self) -> impl Iterator<Item = &str> {
        self.config
            .urls
            .iter()
            .map(|u| u.trim())
            .filter(|u| !u.is_empty())
    }

    fn allows(&self, level: NotificationLevel) -> bool {
        match self.config.level {
            NotificationLevelFilter::All => true,
            NotificationLevelFilter::None => false,
            NotificationLevelFilter::Success => level == NotificationLevel::Success,
            NotificationLevelFilter::Error => level == NotificationLevel::Error,
        }
    }

    fn full_title(&self, title: &str) -> String {
        if title.is_empty() {
            self.config.title.clone()
        } else {
            format!("{}: {}", self.config.title, title)
        }
    }

    async fn dispatch(&self, level: NotificationLevel, title: &str, body: &str) -> Result<()> {
        if !self.config.enabled {
            tracing::debug!("Notifications disabled, nothing sent");
            return Ok(());
        }
        if !self.allows(level) {
            tracing::debug!(level = level.as_str(), "Notification filtered by level");
            return Ok(());
        }

        let payload = WebhookPayload {
            title: self.full_title(title),
            body,
            level,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        let mut sent = 0usize;
        let mut failed = 0usize;
        for url in self.urls() {
            let masked = mask_url(url);
            match self.http.post(url).json(&payload).send().await {
                Ok(response) if response.status().is_success() => {
                    sent += 1;
                    tracing::debug!(url = %masked, "Webhook delivered");
                }
                Ok(response) => {
                    failed += 1;
                    tracing::warn!(url = %masked, status = %response.status(), "Webhook rejected");
                }
                Err(e) => {
                    failed += 1;
                    tracing::warn!(url = %masked, error = %e.without_url(), "Webhook failed");
                }
            }
        }

        if sent == 0 {
            return Err(BackupError::Notification(format!(
                "Failed to deliver notification to any of {failed} endpoint(s)"
            )));
        }

        tracing::info!(sent, failed, level = level.as_str(), "Notification sent");
        Ok(())
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send_success(&self, title: &str, body: &str) -> Result<()> {
        self.dispatch(NotificationLevel::Success, title, body).await
    }

    async fn send_error(&self, title: &str, body: &str) -> Result<()> {
        self.dispatch(NotificationLevel::Error, title, body).await
    }

    async fn test_connection(&self) -> Result<String> {
        if !self.config.enabled {
            return Ok("Notifications disabled".to_string());
        }
        let count = self.urls().count();
        if count == 0 {
            return Err(BackupError::Notification(
                "No notification URLs configured".to_string(),
            ));
        }
        Ok(format!("{count} notification endpoint(s) configured"))
    }
}
