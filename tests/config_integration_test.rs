//! Integration tests for configuration loading and validation
//!
//! Tests that modify environment variables hold `ENV_MUTEX` to avoid
//! interfering with each other.

use notion_backup::config::{load_config, load_config_with_dry_run, StorageBackendKind};
use notion_backup::domain::{BackupError, ExportType, NotificationAction};
use secrecy::ExposeSecret;
use std::io::Write;
use std::sync::Mutex;
use tempfile::NamedTempFile;

// Mutex to serialize tests that modify environment variables
static ENV_MUTEX: Mutex<()> = Mutex::new(());

/// Helper function to clean up environment variables
fn cleanup_env_vars() {
    std::env::remove_var("NOTION_BACKUP_APPLICATION_LOG_LEVEL");
    std::env::remove_var("NOTION_BACKUP_EXPORT_EXPORT_TYPE");
    std::env::remove_var("NOTION_BACKUP_NOTION_TOKEN_V2");
    std::env::remove_var("NOTION_BACKUP_STORAGE_MAX_BACKUPS");
    std::env::remove_var("NOTION_BACKUP_RECOVERY_HOST");
    std::env::remove_var("NOTION_BACKUP_NOTIFICATIONS_URLS");
    std::env::remove_var("TEST_NB_TOKEN_V2");
    std::env::remove_var("TEST_NB_FILE_TOKEN");
}

fn write_config(contents: &str) -> NamedTempFile {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(contents.as_bytes()).unwrap();
    temp_file.flush().unwrap();
    temp_file
}

const MINIMAL: &str = r#"
[notion]
space_id = "space-123"
token_v2 = "v2"
file_token = "file"
"#;

#[test]
fn test_load_complete_config() {
    let _lock = ENV_MUTEX.lock().unwrap();
    cleanup_env_vars();

    let toml_content = r#"
[application]
log_level = "debug"
dry_run = false

[notion]
base_url = "https://notion.example.com"
space_id = "space-123"
token_v2 = "v2"
file_token = "file"
request_timeout_seconds = 15

[export]
export_type = "html"
flatten_export_filetree = true
export_comments = false
time_zone = "Europe/Berlin"
locale = "de"
max_retries = 5
poll_interval_seconds = 20
match_max_attempts = 10
filename_prefix = "team-export"
notification_action = "mark_read"

[storage]
backend = "rclone"
max_backups = 3

[storage.rclone]
remote = "gdrive"
path = "backups/notion"
additional_args = ["--fast-list"]
keep_local = false

[notifications]
enabled = true
level = "error"
urls = ["https://hooks.example.com/a", "https://hooks.example.com/b"]
title = "Team Backup"

[recovery]
host = "redis.internal"
port = 6380
db = 2
password = "redis-secret"
queue_key = "team_queue"

[logging]
local_enabled = true
local_path = "/var/log/notion-backup"
local_rotation = "hourly"
json = true
"#;

    let temp_file = write_config(toml_content);
    let config = load_config(temp_file.path()).unwrap();

    assert_eq!(config.application.log_level, "debug");
    assert_eq!(config.notion.base_url, "https://notion.example.com");
    assert_eq!(config.notion.request_timeout_seconds, 15);
    assert_eq!(config.export.export_type, ExportType::Html);
    assert!(config.export.flatten_export_filetree);
    assert!(!config.export.export_comments);
    assert_eq!(config.export.max_retries, 5);
    assert_eq!(config.export.match_max_attempts, 10);
    assert_eq!(config.export.filename_prefix, "team-export");
    assert_eq!(config.export.notification_action, NotificationAction::MarkRead);
    assert_eq!(config.storage.backend, StorageBackendKind::Rclone);
    assert_eq!(config.storage.max_backups, Some(3));
    let rclone = config.storage.rclone.as_ref().unwrap();
    assert_eq!(rclone.remote, "gdrive");
    assert_eq!(rclone.additional_args, vec!["--fast-list".to_string()]);
    assert!(!rclone.keep_local);
    assert_eq!(config.notifications.urls.len(), 2);
    assert!(config.recovery.is_enabled());
    assert_eq!(config.recovery.display_url(), "redis://redis.internal:6380/2");
    assert!(!config.recovery.display_url().contains("redis-secret"));
    assert!(config.logging.json);
}

#[test]
fn test_load_minimal_config_with_defaults() {
    let _lock = ENV_MUTEX.lock().unwrap();
    cleanup_env_vars();

    let temp_file = write_config(MINIMAL);
    let config = load_config(temp_file.path()).unwrap();

    assert_eq!(config.application.log_level, "info");
    assert!(!config.application.dry_run);
    assert_eq!(config.notion.base_url, "https://www.notion.so");
    assert_eq!(config.export.export_type, ExportType::Markdown);
    assert_eq!(config.export.poll_timeout_seconds, 1200);
    assert_eq!(config.export.match_max_attempts, 20);
    assert_eq!(config.export.match_base_delay_seconds, 5);
    assert_eq!(config.export.match_max_delay_seconds, 60);
    assert_eq!(config.export.notification_action, NotificationAction::None);
    assert_eq!(config.storage.backend, StorageBackendKind::Local);
    assert_eq!(config.storage.local.path, "./downloads");
    assert_eq!(config.storage.max_backups, None);
    assert!(!config.notifications.enabled);
    assert!(!config.recovery.is_enabled());
    assert_eq!(config.recovery.queue_key, "notion_backup_recovery_queue");
}

#[test]
fn test_env_var_substitution() {
    let _lock = ENV_MUTEX.lock().unwrap();
    cleanup_env_vars();

    std::env::set_var("TEST_NB_TOKEN_V2", "substituted-v2");
    std::env::set_var("TEST_NB_FILE_TOKEN", "substituted-file");

    let temp_file = write_config(
        r#"
[notion]
space_id = "space-123"
# token_v2 = "${TEST_NB_NOT_SET}"
token_v2 = "${TEST_NB_TOKEN_V2}"
file_token = "${TEST_NB_FILE_TOKEN}"
"#,
    );
    let config = load_config(temp_file.path()).unwrap();

    assert_eq!(config.notion.token_v2.expose_secret().as_ref(), "substituted-v2");
    assert_eq!(
        config.notion.file_token.expose_secret().as_ref(),
        "substituted-file"
    );

    cleanup_env_vars();
}

#[test]
fn test_missing_substitution_variable() {
    let _lock = ENV_MUTEX.lock().unwrap();
    cleanup_env_vars();

    let temp_file = write_config(
        r#"
[notion]
space_id = "space-123"
token_v2 = "${TEST_NB_TOKEN_V2}"
file_token = "${TEST_NB_FILE_TOKEN}"
"#,
    );
    let err = load_config(temp_file.path()).unwrap_err();

    assert!(matches!(err, BackupError::Configuration(_)));
    let message = err.to_string();
    assert!(message.contains("TEST_NB_TOKEN_V2"));
    assert!(message.contains("TEST_NB_FILE_TOKEN"));
}

#[test]
fn test_env_var_overrides() {
    let _lock = ENV_MUTEX.lock().unwrap();
    cleanup_env_vars();

    std::env::set_var("NOTION_BACKUP_APPLICATION_LOG_LEVEL", "TRACE");
    std::env::set_var("NOTION_BACKUP_EXPORT_EXPORT_TYPE", "html");
    std::env::set_var("NOTION_BACKUP_NOTION_TOKEN_V2", "from-env");
    std::env::set_var("NOTION_BACKUP_STORAGE_MAX_BACKUPS", "4");
    std::env::set_var("NOTION_BACKUP_RECOVERY_HOST", "localhost");

    let temp_file = write_config(MINIMAL);
    let config = load_config(temp_file.path()).unwrap();

    assert_eq!(config.application.log_level, "trace");
    assert_eq!(config.export.export_type, ExportType::Html);
    assert_eq!(config.notion.token_v2.expose_secret().as_ref(), "from-env");
    assert_eq!(config.storage.max_backups, Some(4));
    assert!(config.recovery.is_enabled());

    cleanup_env_vars();
}

#[test]
fn test_invalid_override_value() {
    let _lock = ENV_MUTEX.lock().unwrap();
    cleanup_env_vars();

    std::env::set_var("NOTION_BACKUP_STORAGE_MAX_BACKUPS", "many");
    let temp_file = write_config(MINIMAL);
    let err = load_config(temp_file.path()).unwrap_err();
    assert!(err.to_string().contains("NOTION_BACKUP_STORAGE_MAX_BACKUPS"));

    cleanup_env_vars();
}

#[test]
fn test_invalid_config_validation() {
    let _lock = ENV_MUTEX.lock().unwrap();
    cleanup_env_vars();

    let cases = [
        (
            "[notion]\nspace_id = \"s\"\ntoken_v2 = \"v2\"\nfile_token = \"\"\n",
            "file_token",
        ),
        (
            "[notion]\nspace_id = \"s\"\ntoken_v2 = \"v2\"\nfile_token = \"f\"\n\n[storage]\nbackend = \"rclone\"\n",
            "rclone",
        ),
        (
            "[notion]\nspace_id = \"s\"\ntoken_v2 = \"v2\"\nfile_token = \"f\"\n\n[notifications]\nenabled = true\n",
            "notifications.urls",
        ),
        (
            "[notion]\nspace_id = \"s\"\ntoken_v2 = \"v2\"\nfile_token = \"f\"\n\n[export]\nexport_type = \"pdf\"\n",
            "pdf",
        ),
    ];

    for (toml_content, expected) in cases {
        let temp_file = write_config(toml_content);
        let err = load_config(temp_file.path()).unwrap_err();
        assert!(
            err.to_string().contains(expected),
            "expected '{expected}' in '{err}'"
        );
    }
}

#[test]
fn test_dry_run_flag_relaxes_credentials() {
    let _lock = ENV_MUTEX.lock().unwrap();
    cleanup_env_vars();

    let temp_file = write_config("[storage]\nmax_backups = 2\n");
    assert!(load_config_with_dry_run(temp_file.path(), false).is_err());

    let config = load_config_with_dry_run(temp_file.path(), true).unwrap();
    assert!(config.application.dry_run);
    assert_eq!(config.storage.max_backups, Some(2));
}
