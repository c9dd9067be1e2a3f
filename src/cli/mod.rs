//! CLI interface and argument parsing
//!
//! This module provides the command-line interface using clap.

pub mod commands;

use clap::{Parser, Subcommand};

/// Notion workspace backup tool
#[derive(Parser, Debug)]
#[command(name = "notion-backup")]
#[command(version, about, long_about = None)]
#[command(author = "Notion Backup Contributors")]
pub struct Cli {
    /// Path to configuration file
    #[arg(
        short,
        long,
        global = true,
        default_value = "notion-backup.toml",
        env = "NOTION_BACKUP_CONFIG"
    )]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true, env = "NOTION_BACKUP_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Skip the platform and create a dummy export archive instead
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Subcommand to execute (defaults to `backup`)
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run a workspace backup (default)
    Backup(commands::backup::BackupArgs),

    /// List stored backups, newest first
    List(commands::list::ListArgs),

    /// Delete old backups, keeping the newest N
    Cleanup(commands::cleanup::CleanupArgs),

    /// Test storage, notification and recovery store connectivity
    Test(commands::test::TestArgs),

    /// Show exports waiting in the recovery queue
    Status(commands::status::StatusArgs),

    /// Validate configuration file
    ValidateConfig(commands::validate::ValidateArgs),

    /// Initialize a new configuration file
    Init(commands::init::InitArgs),
}

impl Cli {
    /// The subcommand to run, with `backup` standing in when none was given
    pub fn command_or_default(&self) -> Commands {
        match &self.command {
            Some(command) => command.clone(),
            None => Commands::Backup(commands::backup::BackupArgs::default()),
        }
    }
}
