//! Configuration schema types
//!
//! This module defines the configuration structure that maps to
//! `notion-backup.toml`. Every section validates itself and reports the
//! first problem as a plain message; the loader wraps it into
//! `BackupError::Configuration`.

use crate::config::{secret_string, SecretString};
use crate::domain::{ExportType, NotificationAction};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

/// Main configuration
///
/// This is the root configuration structure that maps to the TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupConfig {
    /// Application-level settings
    #[serde(default)]
    pub application: ApplicationConfig,

    /// Platform connection and session credentials
    #[serde(default)]
    pub notion: NotionConfig,

    /// Export request options and protocol timings
    #[serde(default)]
    pub export: ExportConfig,

    /// Storage destination for finished archives
    #[serde(default)]
    pub storage: StorageConfig,

    /// Outbound notifications
    #[serde(default)]
    pub notifications: NotificationConfig,

    /// Recovery queue backing store (optional)
    #[serde(default)]
    pub recovery: RecoveryConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl BackupConfig {
    /// Validates the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid
    pub fn validate(&self) -> Result<(), String> {
        self.application.validate()?;
        // Dry runs never talk to the platform, so credentials may be absent.
        if !self.application.dry_run {
            self.notion.validate()?;
        }
        self.export.validate()?;
        self.storage.validate()?;
        self.notifications.validate()?;
        self.recovery.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}

/// Application-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Dry run mode (no platform calls, dummy archive)
    #[serde(default)]
    pub dry_run: bool,
}

impl ApplicationConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.as_str()) {
            return Err(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            ));
        }
        Ok(())
    }
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            dry_run: false,
        }
    }
}

/// Platform connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotionConfig {
    /// Base URL of the web client API host
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Workspace (space) to export
    #[serde(default)]
    pub space_id: String,

    /// Primary session cookie
    /// Stored securely in memory and automatically zeroized on drop
    #[serde(default = "empty_secret")]
    pub token_v2: SecretString,

    /// File download cookie
    /// Stored securely in memory and automatically zeroized on drop
    #[serde(default = "empty_secret")]
    pub file_token: SecretString,

    /// Browser user agent sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Per-request timeout for API calls
    #[serde(default = "default_request_timeout_seconds")]
    pub request_timeout_seconds: u64,
}

impl NotionConfig {
    fn validate(&self) -> Result<(), String> {
        if self.base_url.is_empty() {
            return Err("notion.base_url cannot be empty".to_string());
        }

        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err("notion.base_url must start with http:// or https://".to_string());
        }

        if self.space_id.trim().is_empty() {
            return Err("notion.space_id cannot be empty".to_string());
        }

        if self.token_v2.expose_secret().is_empty() {
            return Err("notion.token_v2 cannot be empty".to_string());
        }

        if self.file_token.expose_secret().is_empty() {
            return Err("notion.file_token cannot be empty".to_string());
        }

        if self.request_timeout_seconds == 0 {
            return Err("notion.request_timeout_seconds must be > 0".to_string());
        }

        Ok(())
    }
}

impl Default for NotionConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            space_id: String::new(),
            token_v2: empty_secret(),
            file_token: empty_secret(),
            user_agent: default_user_agent(),
            request_timeout_seconds: default_request_timeout_seconds(),
        }
    }
}

/// Export request options and protocol timings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Archive flavour (markdown or html)
    #[serde(default)]
    pub export_type: ExportType,

    /// Flatten the exported file tree
    #[serde(default)]
    pub flatten_export_filetree: bool,

    /// Include comments in the export
    #[serde(default = "default_true")]
    pub export_comments: bool,

    #[serde(default = "default_time_zone")]
    pub time_zone: String,

    #[serde(default = "default_locale")]
    pub locale: String,

    /// Export nested pages
    #[serde(default = "default_true")]
    pub recursive: bool,

    /// Enqueue attempts before giving up
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Fixed delay between enqueue attempts
    #[serde(default = "default_retry_delay_seconds")]
    pub retry_delay_seconds: u64,

    #[serde(default = "default_poll_interval_seconds")]
    pub poll_interval_seconds: u64,

    /// Ceiling on the total time spent waiting for the task
    #[serde(default = "default_poll_timeout_seconds")]
    pub poll_timeout_seconds: u64,

    /// Feed fetch + match attempts before reporting no match
    #[serde(default = "default_match_max_attempts")]
    pub match_max_attempts: u32,

    #[serde(default = "default_match_base_delay_seconds")]
    pub match_base_delay_seconds: u64,

    #[serde(default = "default_match_max_delay_seconds")]
    pub match_max_delay_seconds: u64,

    /// Notifications requested per feed snapshot
    #[serde(default = "default_feed_page_size")]
    pub feed_page_size: u32,

    #[serde(default = "default_download_timeout_seconds")]
    pub download_timeout_seconds: u64,

    /// Leading part of every archive file name
    #[serde(default = "default_filename_prefix")]
    pub filename_prefix: String,

    /// State change applied to the matched notification
    #[serde(default)]
    pub notification_action: NotificationAction,
}

impl ExportConfig {
    fn validate(&self) -> Result<(), String> {
        if self.time_zone.trim().is_empty() {
            return Err("export.time_zone cannot be empty".to_string());
        }

        if self.locale.trim().is_empty() {
            return Err("export.locale cannot be empty".to_string());
        }

        if self.max_retries == 0 {
            return Err("export.max_retries must be > 0".to_string());
        }

        if self.poll_interval_seconds == 0 {
            return Err("export.poll_interval_seconds must be > 0".to_string());
        }

        if self.poll_timeout_seconds < self.poll_interval_seconds {
            return Err(
                "export.poll_timeout_seconds must be >= export.poll_interval_seconds".to_string(),
            );
        }

        if self.match_max_attempts == 0 {
            return Err("export.match_max_attempts must be > 0".to_string());
        }

        if self.match_max_delay_seconds < self.match_base_delay_seconds {
            return Err(
                "export.match_max_delay_seconds must be >= export.match_base_delay_seconds"
                    .to_string(),
            );
        }

        if self.feed_page_size == 0 || self.feed_page_size > 100 {
            return Err("export.feed_page_size must be between 1 and 100".to_string());
        }

        if self.download_timeout_seconds == 0 {
            return Err("export.download_timeout_seconds must be > 0".to_string());
        }

        let prefix = self.filename_prefix.trim();
        if prefix.is_empty() {
            return Err("export.filename_prefix cannot be empty".to_string());
        }
        if prefix.contains(['/', '\\']) {
            return Err("export.filename_prefix cannot contain path separators".to_string());
        }

        Ok(())
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            export_type: ExportType::default(),
            flatten_export_filetree: false,
            export_comments: true,
            time_zone: default_time_zone(),
            locale: default_locale(),
            recursive: true,
            max_retries: default_max_retries(),
            retry_delay_seconds: default_retry_delay_seconds(),
            poll_interval_seconds: default_poll_interval_seconds(),
            poll_timeout_seconds: default_poll_timeout_seconds(),
            match_max_attempts: default_match_max_attempts(),
            match_base_delay_seconds: default_match_base_delay_seconds(),
            match_max_delay_seconds: default_match_max_delay_seconds(),
            feed_page_size: default_feed_page_size(),
            download_timeout_seconds: default_download_timeout_seconds(),
            filename_prefix: default_filename_prefix(),
            notification_action: NotificationAction::default(),
        }
    }
}

/// Storage backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackendKind {
    /// Copy into a local directory
    #[default]
    Local,
    /// Upload through the rclone binary
    Rclone,
}

impl StorageBackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageBackendKind::Local => "local",
            StorageBackendKind::Rclone => "rclone",
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackendKind,

    /// Retention limit applied after each successful store
    #[serde(default)]
    pub max_backups: Option<usize>,

    #[serde(default)]
    pub local: LocalStorageConfig,

    /// Required when backend = "rclone"
    #[serde(default)]
    pub rclone: Option<RcloneStorageConfig>,
}

impl StorageConfig {
    fn validate(&self) -> Result<(), String> {
        if self.max_backups == Some(0) {
            return Err("storage.max_backups must be > 0 when set".to_string());
        }

        match self.backend {
            StorageBackendKind::Local => self.local.validate(),
            StorageBackendKind::Rclone => match self.rclone {
                Some(ref rclone) => rclone.validate(),
                None => Err(
                    "storage.rclone configuration is required when backend = 'rclone'"
                        .to_string(),
                ),
            },
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackendKind::default(),
            max_backups: None,
            local: LocalStorageConfig::default(),
            rclone: None,
        }
    }
}

/// Local directory storage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalStorageConfig {
    #[serde(default = "default_local_storage_path")]
    pub path: String,
}

impl LocalStorageConfig {
    fn validate(&self) -> Result<(), String> {
        if self.path.trim().is_empty() {
            return Err("storage.local.path cannot be empty".to_string());
        }
        Ok(())
    }
}

impl Default for LocalStorageConfig {
    fn default() -> Self {
        Self {
            path: default_local_storage_path(),
        }
    }
}

/// Remote storage through rclone
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RcloneStorageConfig {
    /// Remote name as configured in rclone (without the trailing colon)
    pub remote: String,

    /// Directory on the remote
    #[serde(default = "default_rclone_path")]
    pub path: String,

    /// Explicit rclone config file
    #[serde(default)]
    pub config_path: Option<String>,

    /// Extra arguments appended to every rclone invocation
    #[serde(default)]
    pub additional_args: Vec<String>,

    /// Keep the local archive after a successful upload
    #[serde(default = "default_true")]
    pub keep_local: bool,

    #[serde(default = "default_rclone_binary")]
    pub binary: String,
}

impl RcloneStorageConfig {
    fn validate(&self) -> Result<(), String> {
        if self.remote.trim().is_empty() {
            return Err("storage.rclone.remote cannot be empty".to_string());
        }
        if self.remote.ends_with(':') {
            return Err("storage.rclone.remote must not include the trailing ':'".to_string());
        }
        if self.binary.trim().is_empty() {
            return Err("storage.rclone.binary cannot be empty".to_string());
        }
        Ok(())
    }
}

/// Which outcomes produce a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevelFilter {
    Success,
    Error,
    #[default]
    All,
    None,
}

/// Notification configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub level: NotificationLevelFilter,

    /// Webhook endpoints; each receives the same JSON payload
    #[serde(default)]
    pub urls: Vec<String>,

    /// Prefix for every notification title
    #[serde(default = "default_notification_title")]
    pub title: String,

    #[serde(default = "default_notification_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl NotificationConfig {
    fn validate(&self) -> Result<(), String> {
        if !self.enabled {
            return Ok(());
        }

        if self.urls.iter().all(|u| u.trim().is_empty()) {
            return Err("notifications.urls must contain at least one URL when enabled".to_string());
        }

        for raw in self.urls.iter().filter(|u| !u.trim().is_empty()) {
            let parsed = url::Url::parse(raw.trim()).map_err(|_| {
                format!(
                    "Invalid notification URL '{}'",
                    crate::logging::mask::mask_url(raw)
                )
            })?;
            if parsed.scheme() != "http" && parsed.scheme() != "https" {
                return Err(format!(
                    "Notification URL '{}' must use http or https",
                    crate::logging::mask::mask_url(raw)
                ));
            }
        }

        if self.timeout_seconds == 0 {
            return Err("notifications.timeout_seconds must be > 0".to_string());
        }

        Ok(())
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            level: NotificationLevelFilter::default(),
            urls: Vec::new(),
            title: default_notification_title(),
            timeout_seconds: default_notification_timeout_seconds(),
        }
    }
}

/// Recovery queue backing store configuration
///
/// Leaving `host` unset disables the recovery queue entirely.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecoveryConfig {
    #[serde(default)]
    pub host: Option<String>,

    #[serde(default = "default_redis_port")]
    pub port: u16,

    #[serde(default)]
    pub db: i64,

    #[serde(default)]
    pub username: Option<String>,

    /// Stored securely in memory and automatically zeroized on drop
    #[serde(default)]
    pub password: Option<SecretString>,

    /// List key holding pending recovery entries
    #[serde(default = "default_queue_key")]
    pub queue_key: String,

    #[serde(default = "default_connect_timeout_seconds")]
    pub connect_timeout_seconds: u64,

    /// Connect over TLS (`rediss://`)
    #[serde(default)]
    pub tls: bool,

    /// Verify the server certificate; `false` accepts any certificate
    #[serde(default = "default_tls_verify")]
    pub tls_verify: bool,

    /// PEM bundle used instead of the system trust store
    #[serde(default)]
    pub ca_cert_path: Option<String>,
}

impl RecoveryConfig {
    /// Whether a backing store is configured
    pub fn is_enabled(&self) -> bool {
        self.host.as_deref().is_some_and(|h| !h.trim().is_empty())
    }

    fn scheme(&self) -> &'static str {
        if self.tls {
            "rediss"
        } else {
            "redis"
        }
    }

    /// Connection URL including credentials
    ///
    /// With `tls` on the scheme is `rediss`, and `tls_verify = false` adds
    /// the `#insecure` fragment. The returned string contains the password
    /// and must not be logged; use [`RecoveryConfig::display_url`] for
    /// diagnostics.
    pub fn connection_url(&self) -> Option<String> {
        let host = self.host.as_deref().filter(|h| !h.trim().is_empty())?;
        let mut url = url::Url::parse(&format!(
            "{}://{}:{}/{}",
            self.scheme(),
            host,
            self.port,
            self.db
        ))
        .ok()?;
        if let Some(ref username) = self.username {
            url.set_username(username).ok()?;
        }
        if let Some(ref password) = self.password {
            url.set_password(Some(password.expose_secret().as_ref())).ok()?;
        }
        if self.tls && !self.tls_verify {
            url.set_fragment(Some("insecure"));
        }
        Some(url.to_string())
    }

    /// Connection target without credentials, safe for logs
    pub fn display_url(&self) -> String {
        match self.host.as_deref() {
            Some(host) => {
                let insecure = if self.tls && !self.tls_verify { "#insecure" } else { "" };
                format!("{}://{}:{}/{}{}", self.scheme(), host, self.port, self.db, insecure)
            }
            None => "<disabled>".to_string(),
        }
    }

    fn validate(&self) -> Result<(), String> {
        if !self.is_enabled() {
            return Ok(());
        }

        if self.port == 0 {
            return Err("recovery.port must be > 0".to_string());
        }

        if self.db < 0 {
            return Err("recovery.db must be >= 0".to_string());
        }

        if self.queue_key.trim().is_empty() {
            return Err("recovery.queue_key cannot be empty".to_string());
        }

        if self.connect_timeout_seconds == 0 {
            return Err("recovery.connect_timeout_seconds must be > 0".to_string());
        }

        if let Some(ref ca) = self.ca_cert_path {
            if !self.tls {
                return Err("recovery.ca_cert_path requires recovery.tls = true".to_string());
            }
            if ca.trim().is_empty() {
                return Err("recovery.ca_cert_path cannot be empty".to_string());
            }
        }

        if self.connection_url().is_none() {
            return Err(format!(
                "recovery.host '{}' does not form a valid connection URL",
                self.host.as_deref().unwrap_or_default()
            ));
        }

        Ok(())
    }
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            host: None,
            port: default_redis_port(),
            db: 0,
            username: None,
            password: None,
            queue_key: default_queue_key(),
            connect_timeout_seconds: default_connect_timeout_seconds(),
            tls: false,
            tls_verify: default_tls_verify(),
            ca_cert_path: None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Enable the rolling file layer
    #[serde(default)]
    pub local_enabled: bool,

    /// Directory for log files
    #[serde(default = "default_log_path")]
    pub local_path: String,

    /// Log rotation strategy (daily, hourly, never)
    #[serde(default = "default_local_rotation")]
    pub local_rotation: String,

    /// Emit console output as JSON
    #[serde(default)]
    pub json: bool,
}

impl LoggingConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&self.local_rotation.as_str()) {
            return Err(format!(
                "Invalid logging.local_rotation '{}'. Must be one of: {}",
                self.local_rotation,
                valid_rotations.join(", ")
            ));
        }

        if self.local_enabled && self.local_path.trim().is_empty() {
            return Err("logging.local_path cannot be empty when local_enabled".to_string());
        }

        Ok(())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            local_enabled: false,
            local_path: default_log_path(),
            local_rotation: default_local_rotation(),
            json: false,
        }
    }
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_base_url() -> String {
    "https://www.notion.so".to_string()
}

fn empty_secret() -> SecretString {
    secret_string(String::new())
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:139.0) Gecko/20100101 Firefox/139.0"
        .to_string()
}

fn default_request_timeout_seconds() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

fn default_time_zone() -> String {
    "UTC".to_string()
}

fn default_locale() -> String {
    "en".to_string()
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_seconds() -> u64 {
    5
}

fn default_poll_interval_seconds() -> u64 {
    10
}

fn default_poll_timeout_seconds() -> u64 {
    1200
}

fn default_match_max_attempts() -> u32 {
    20
}

fn default_match_base_delay_seconds() -> u64 {
    5
}

fn default_match_max_delay_seconds() -> u64 {
    60
}

fn default_feed_page_size() -> u32 {
    20
}

fn default_download_timeout_seconds() -> u64 {
    300
}

fn default_filename_prefix() -> String {
    "notion-export".to_string()
}

fn default_local_storage_path() -> String {
    "./downloads".to_string()
}

fn default_rclone_path() -> String {
    "notion-backups".to_string()
}

fn default_rclone_binary() -> String {
    "rclone".to_string()
}

fn default_notification_title() -> String {
    "Notion Backup".to_string()
}

fn default_notification_timeout_seconds() -> u64 {
    10
}

fn default_redis_port() -> u16 {
    6379
}

fn default_queue_key() -> String {
    "notion_backup_recovery_queue".to_string()
}

fn default_connect_timeout_seconds() -> u64 {
    5
}

fn default_tls_verify() -> bool {
    true
}

fn default_log_path() -> String {
    "./logs".to_string()
}

fn default_local_rotation() -> String {
    "daily".to_string()
}
