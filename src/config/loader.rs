//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::{BackupConfig, NotificationLevelFilter, RcloneStorageConfig, StorageBackendKind};
use super::secret::secret_string;
use crate::domain::errors::BackupError;
use crate::domain::result::Result;
use crate::domain::{ExportType, NotificationAction};
use regex::Regex;
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// Prefix for environment variable overrides
pub const ENV_PREFIX: &str = "NOTION_BACKUP";

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (${VAR} syntax)
/// 3. Parses the TOML into BackupConfig
/// 4. Applies environment variable overrides (NOTION_BACKUP_* prefix)
/// 5. Validates the configuration
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Errors
///
/// Returns an error if:
/// - File cannot be read
/// - TOML parsing fails
/// - A referenced environment variable is not set
/// - An override carries an unparseable value
/// - Configuration validation fails
///
/// # Examples
///
/// ```no_run
/// use notion_backup::config::loader::load_config;
///
/// let config = load_config("notion-backup.toml").expect("Failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<BackupConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(BackupError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        BackupError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    parse_config(&contents, false)
}

/// Loads configuration like [`load_config`], forcing dry-run mode before
/// validation when `dry_run` is set
///
/// Dry runs do not need platform credentials, so the `--dry-run` flag has to
/// take effect before the `[notion]` section is validated.
pub fn load_config_with_dry_run(path: impl AsRef<Path>, dry_run: bool) -> Result<BackupConfig> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|e| {
        BackupError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    parse_config(&contents, dry_run)
}

/// Loads configuration from TOML text, with the same substitution, override
/// and validation steps as [`load_config`]
pub fn load_config_str(contents: &str) -> Result<BackupConfig> {
    parse_config(contents, false)
}

fn parse_config(contents: &str, force_dry_run: bool) -> Result<BackupConfig> {
    let contents = substitute_env_vars(contents)?;

    let mut config: BackupConfig = toml::from_str(&contents)
        .map_err(|e| BackupError::Configuration(format!("Failed to parse TOML: {e}")))?;

    apply_env_overrides(&mut config)?;
    if force_dry_run {
        config.application.dry_run = true;
    }

    config.validate().map_err(|e| {
        BackupError::Configuration(format!("Configuration validation failed: {e}"))
    })?;

    Ok(config)
}

/// Substitutes environment variables in the format ${VAR_NAME}
///
/// Comment lines are copied unchanged. Every missing variable is reported in
/// a single error.
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
        .map_err(|e| BackupError::Configuration(format!("Invalid substitution pattern: {e}")))?;
    let mut result = String::with_capacity(input.len());
    let mut missing_vars: Vec<String> = Vec::new();

    for line in input.lines() {
        if line.trim_start().starts_with('#') {
            result.push_str(line);
            result.push('\n');
            continue;
        }

        let mut processed_line = line.to_string();
        for cap in re.captures_iter(line) {
            let var_name = &cap[1];
            match std::env::var(var_name) {
                Ok(value) => {
                    let placeholder = format!("${{{var_name}}}");
                    processed_line = processed_line.replace(&placeholder, &value);
                }
                Err(_) => {
                    if !missing_vars.iter().any(|v| v == var_name) {
                        missing_vars.push(var_name.to_string());
                    }
                }
            }
        }
        result.push_str(&processed_line);
        result.push('\n');
    }

    if !missing_vars.is_empty() {
        return Err(BackupError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(result)
}

fn env_var(section: &str, key: &str) -> Option<String> {
    std::env::var(format!("{ENV_PREFIX}_{section}_{key}")).ok()
}

fn parse_override<T: FromStr>(section: &str, key: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| {
        BackupError::Configuration(format!(
            "Invalid value '{value}' for {ENV_PREFIX}_{section}_{key}"
        ))
    })
}

/// Applies environment variable overrides using the NOTION_BACKUP_* prefix
///
/// Environment variables follow the pattern: NOTION_BACKUP_<SECTION>_<KEY>
/// For example: NOTION_BACKUP_NOTION_TOKEN_V2, NOTION_BACKUP_EXPORT_EXPORT_TYPE
///
/// # Arguments
///
/// * `config` - Mutable reference to the configuration to update
fn apply_env_overrides(config: &mut BackupConfig) -> Result<()> {
    // Application overrides
    if let Some(val) = env_var("APPLICATION", "LOG_LEVEL") {
        config.application.log_level = val.to_lowercase();
    }
    if let Some(val) = env_var("APPLICATION", "DRY_RUN") {
        config.application.dry_run = parse_override("APPLICATION", "DRY_RUN", &val)?;
    }

    // Platform overrides
    if let Some(val) = env_var("NOTION", "BASE_URL") {
        config.notion.base_url = val;
    }
    if let Some(val) = env_var("NOTION", "SPACE_ID") {
        config.notion.space_id = val;
    }
    if let Some(val) = env_var("NOTION", "TOKEN_V2") {
        config.notion.token_v2 = secret_string(val);
    }
    if let Some(val) = env_var("NOTION", "FILE_TOKEN") {
        config.notion.file_token = secret_string(val);
    }
    if let Some(val) = env_var("NOTION", "USER_AGENT") {
        config.notion.user_agent = val;
    }

    // Export overrides
    if let Some(val) = env_var("EXPORT", "EXPORT_TYPE") {
        config.export.export_type = ExportType::from_str(&val).map_err(BackupError::Configuration)?;
    }
    if let Some(val) = env_var("EXPORT", "FLATTEN_EXPORT_FILETREE") {
        config.export.flatten_export_filetree =
            parse_override("EXPORT", "FLATTEN_EXPORT_FILETREE", &val)?;
    }
    if let Some(val) = env_var("EXPORT", "EXPORT_COMMENTS") {
        config.export.export_comments = parse_override("EXPORT", "EXPORT_COMMENTS", &val)?;
    }
    if let Some(val) = env_var("EXPORT", "TIME_ZONE") {
        config.export.time_zone = val;
    }
    if let Some(val) = env_var("EXPORT", "MAX_RETRIES") {
        config.export.max_retries = parse_override("EXPORT", "MAX_RETRIES", &val)?;
    }
    if let Some(val) = env_var("EXPORT", "DOWNLOAD_TIMEOUT_SECONDS") {
        config.export.download_timeout_seconds =
            parse_override("EXPORT", "DOWNLOAD_TIMEOUT_SECONDS", &val)?;
    }
    if let Some(val) = env_var("EXPORT", "NOTIFICATION_ACTION") {
        config.export.notification_action =
            NotificationAction::from_str(&val).map_err(BackupError::Configuration)?;
    }

    // Storage overrides
    if let Some(val) = env_var("STORAGE", "BACKEND") {
        config.storage.backend = match val.to_lowercase().as_str() {
            "local" => StorageBackendKind::Local,
            "rclone" => StorageBackendKind::Rclone,
            other => {
                return Err(BackupError::Configuration(format!(
                    "Invalid storage backend '{other}'. Must be one of: local, rclone"
                )))
            }
        };
    }
    if let Some(val) = env_var("STORAGE", "MAX_BACKUPS") {
        config.storage.max_backups = Some(parse_override("STORAGE", "MAX_BACKUPS", &val)?);
    }
    if let Some(val) = env_var("STORAGE", "LOCAL_PATH") {
        config.storage.local.path = val;
    }
    if let Some(val) = env_var("STORAGE", "RCLONE_REMOTE") {
        match config.storage.rclone {
            Some(ref mut rclone) => rclone.remote = val,
            None => {
                config.storage.rclone = Some(RcloneStorageConfig {
                    remote: val,
                    path: "notion-backups".to_string(),
                    config_path: None,
                    additional_args: Vec::new(),
                    keep_local: true,
                    binary: "rclone".to_string(),
                })
            }
        }
    }
    if let Some(ref mut rclone) = config.storage.rclone {
        if let Some(val) = env_var("STORAGE", "RCLONE_PATH") {
            rclone.path = val;
        }
        if let Some(val) = env_var("STORAGE", "RCLONE_CONFIG_PATH") {
            rclone.config_path = Some(val);
        }
    }

    // Notification overrides
    if let Some(val) = env_var("NOTIFICATIONS", "ENABLED") {
        config.notifications.enabled = parse_override("NOTIFICATIONS", "ENABLED", &val)?;
    }
    if let Some(val) = env_var("NOTIFICATIONS", "LEVEL") {
        config.notifications.level = match val.to_lowercase().as_str() {
            "success" => NotificationLevelFilter::Success,
            "error" => NotificationLevelFilter::Error,
            "all" => NotificationLevelFilter::All,
            "none" => NotificationLevelFilter::None,
            other => {
                return Err(BackupError::Configuration(format!(
                    "Invalid notification level '{other}'. Must be one of: success, error, all, none"
                )))
            }
        };
    }
    if let Some(val) = env_var("NOTIFICATIONS", "URLS") {
        config.notifications.urls = val
            .split(',')
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .map(String::from)
            .collect();
    }

    // Recovery store overrides
    if let Some(val) = env_var("RECOVERY", "HOST") {
        config.recovery.host = Some(val);
    }
    if let Some(val) = env_var("RECOVERY", "PORT") {
        config.recovery.port = parse_override("RECOVERY", "PORT", &val)?;
    }
    if let Some(val) = env_var("RECOVERY", "DB") {
        config.recovery.db = parse_override("RECOVERY", "DB", &val)?;
    }
    if let Some(val) = env_var("RECOVERY", "USERNAME") {
        config.recovery.username = Some(val);
    }
    if let Some(val) = env_var("RECOVERY", "PASSWORD") {
        config.recovery.password = Some(secret_string(val));
    }
    if let Some(val) = env_var("RECOVERY", "QUEUE_KEY") {
        config.recovery.queue_key = val;
    }
    if let Some(val) = env_var("RECOVERY", "TLS") {
        config.recovery.tls = parse_override("RECOVERY", "TLS", &val)?;
    }
    if let Some(val) = env_var("RECOVERY", "TLS_VERIFY") {
        config.recovery.tls_verify = parse_override("RECOVERY", "TLS_VERIFY", &val)?;
    }
    if let Some(val) = env_var("RECOVERY", "CA_CERT_PATH") {
        config.recovery.ca_cert_path = Some(val);
    }

    // Logging overrides
    if let Some(val) = env_var("LOGGING", "LOCAL_ENABLED") {
        config.logging.local_enabled = parse_override("LOGGING", "LOCAL_ENABLED", &val)?;
    }
    if let Some(val) = env_var("LOGGING", "LOCAL_PATH") {
        config.logging.local_path = val;
    }
    if let Some(val) = env_var("LOGGING", "JSON") {
        config.logging.json = parse_override("LOGGING", "JSON", &val)?;
    }

    Ok(())
}
