//! Logging and observability
//!
//! This module provides structured logging with support for:
//! - Plain or JSON console output
//! - Configurable log levels
//! - Local file logging with rotation
//! - Masking of URLs and secrets before they are logged
//!
//! # Example
//!
//! ```no_run
//! use notion_backup::logging::init_logging;
//! use notion_backup::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!("Application started");
//! ```

pub mod mask;
pub mod structured;

// Re-export commonly used items
pub use mask::{mask_path, mask_secret, mask_url};
pub use structured::{init_logging, LoggingGuard};

/// Log a retry attempt
///
/// # Example
///
/// ```no_run
/// use notion_backup::log_retry_attempt;
///
/// log_retry_attempt!(2, 3, "Connection timeout");
/// ```
#[macro_export]
macro_rules! log_retry_attempt {
    ($attempt:expr, $max_attempts:expr, $reason:expr) => {
        tracing::warn!(
            attempt = $attempt,
            max_attempts = $max_attempts,
            reason = %$reason,
            "Retrying operation"
        );
    };
}

/// Log an orchestrator phase change
///
/// # Example
///
/// ```no_run
/// use notion_backup::log_phase_transition;
/// use notion_backup::domain::ExportPhase;
///
/// log_phase_transition!(ExportPhase::Triggering, ExportPhase::Polling);
/// ```
#[macro_export]
macro_rules! log_phase_transition {
    ($from:expr, $to:expr) => {
        tracing::debug!(from = %$from, to = %$to, "Phase transition");
    };
}
