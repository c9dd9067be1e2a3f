//! Init command implementation
//!
//! This module implements the `init` command for generating a sample
//! configuration file.

use super::{EXIT_CONFIG_ERROR, EXIT_FATAL, EXIT_SUCCESS};
use clap::Args;
use std::fs;
use std::path::Path;

/// Arguments for the init command
#[derive(Args, Debug, Clone)]
pub struct InitArgs {
    /// Path where to create the configuration file
    #[arg(short, long, default_value = "notion-backup.toml")]
    pub output: String,

    /// Include every option with comments
    #[arg(long)]
    pub with_examples: bool,

    /// Overwrite existing file
    #[arg(long)]
    pub force: bool,
}

impl Default for InitArgs {
    fn default() -> Self {
        Self {
            output: "notion-backup.toml".to_string(),
            with_examples: false,
            force: false,
        }
    }
}

impl InitArgs {
    /// Execute the init command
    pub async fn execute(&self) -> anyhow::Result<i32> {
        tracing::info!(output = %self.output, "Initializing configuration file");

        println!("📝 Initializing notion-backup configuration");
        println!();

        if Path::new(&self.output).exists() && !self.force {
            println!("❌ Configuration file already exists: {}", self.output);
            println!("   Use --force to overwrite");
            return Ok(EXIT_CONFIG_ERROR);
        }

        let config_content = if self.with_examples {
            Self::generate_config_with_examples()
        } else {
            Self::generate_minimal_config()
        };

        match fs::write(&self.output, config_content) {
            Ok(_) => {
                println!("✅ Configuration file created: {}", self.output);
                println!();
                println!("Next steps:");
                println!("  1. Edit {} with your workspace ID", self.output);
                println!("  2. Create a .env file with your session tokens:");
                println!("     - NOTION_TOKEN_V2 (the token_v2 browser cookie)");
                println!("     - NOTION_FILE_TOKEN (the file_token browser cookie)");
                println!("  3. Validate configuration: notion-backup validate-config");
                println!("  4. Try a dry run: notion-backup --dry-run");
                println!("  5. Run a backup: notion-backup");
                println!();
                Ok(EXIT_SUCCESS)
            }
            Err(e) => {
                println!("❌ Failed to write configuration file");
                println!("   Error: {e}");
                Ok(EXIT_FATAL)
            }
        }
    }

    /// Generate minimal configuration
    fn generate_minimal_config() -> String {
        r#"# notion-backup configuration

[notion]
space_id = "your-workspace-id"
token_v2 = "${NOTION_TOKEN_V2}"
file_token = "${NOTION_FILE_TOKEN}"

[export]
export_type = "markdown"

[storage]
backend = "local"
max_backups = 10

[storage.local]
path = "./downloads"
"#
        .to_string()
    }

    /// Generate configuration with examples and comments
    fn generate_config_with_examples() -> String {
        r#"# notion-backup configuration
#
# Every option is shown with its default value. Values may reference
# environment variables as ${VAR_NAME}, and any key can be overridden with
# NOTION_BACKUP_<SECTION>_<KEY>, e.g. NOTION_BACKUP_EXPORT_EXPORT_TYPE=html.

# ============================================================================
# Application Settings
# ============================================================================
[application]
# Log level (trace, debug, info, warn, error)
log_level = "info"

# Create a dummy archive instead of contacting the platform
dry_run = false

# ============================================================================
# Workspace and Session
# ============================================================================
[notion]
base_url = "https://www.notion.so"

# Workspace (space) ID
space_id = "your-workspace-id"

# Session cookies copied from a logged-in browser
token_v2 = "${NOTION_TOKEN_V2}"
file_token = "${NOTION_FILE_TOKEN}"

# Per-request timeout
request_timeout_seconds = 30

# ============================================================================
# Export Options
# ============================================================================
[export]
# markdown | html
export_type = "markdown"
flatten_export_filetree = false
export_comments = true
time_zone = "UTC"
locale = "en"
recursive = true

# Enqueue attempts and the fixed delay between them
max_retries = 3
retry_delay_seconds = 5

# Task status polling
poll_interval_seconds = 10
poll_timeout_seconds = 1200

# Activity feed matching (exponential backoff, capped)
match_max_attempts = 20
match_base_delay_seconds = 5
match_max_delay_seconds = 60
feed_page_size = 20

download_timeout_seconds = 300
filename_prefix = "notion-export"

# What to do with the export notification after a successful backup
# none | mark_read | mark_unread | archive | unarchive
notification_action = "none"

# ============================================================================
# Storage
# ============================================================================
[storage]
# local | rclone
backend = "local"

# Keep only the newest N backups (omit to keep everything)
max_backups = 10

[storage.local]
path = "./downloads"

# [storage.rclone]
# remote = "gdrive"
# path = "notion-backups"
# config_path = "/home/user/.config/rclone/rclone.conf"
# additional_args = ["--progress"]
# keep_local = true
# binary = "rclone"

# ============================================================================
# Notifications
# ============================================================================
[notifications]
enabled = false

# success | error | all | none
level = "all"

# Webhook endpoints receiving {title, body, level, timestamp} as JSON
urls = []
title = "Notion Backup"
timeout_seconds = 10

# ============================================================================
# Recovery Queue
# ============================================================================
# Exports that finished on the platform but were never stored are queued in
# Redis and retried on the next run. Leave host unset to disable.
[recovery]
# host = "localhost"
port = 6379
db = 0
# username = "default"
# password = "${NOTION_BACKUP_REDIS_PASSWORD}"
queue_key = "notion_backup_recovery_queue"
connect_timeout_seconds = 5
# Hosted stores usually require TLS
tls = false
# tls_verify = true
# ca_cert_path = "/etc/ssl/certs/redis-ca.pem"

# ============================================================================
# Logging
# ============================================================================
[logging]
local_enabled = false
local_path = "./logs"

# daily | hourly | never
local_rotation = "daily"

# Console output as JSON
json = false
"#
        .to_string()
    }
}
