//! Export acquisition and orchestration
//!
//! This module provides the core export logic, including:
//! - Retry policies and protocol timings
//! - Correlation of task completion with the activity feed
//! - Archive naming and checksums
//! - Run coordination and summary reporting

pub mod artifact;
pub mod coordinator;
pub mod matcher;
pub mod retry;
pub mod summary;

pub use coordinator::ExportCoordinator;
pub use matcher::{match_completion, CompletionMatch};
pub use retry::{ProtocolTimings, RetryPolicy};
pub use summary::{ArtifactInfo, RunSummary};
