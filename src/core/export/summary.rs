//! Run summary and reporting
//!
//! This module defines the structure that records what a single backup run
//! did, for logging and for the CLI report.

use crate::core::export::artifact::format_file_size;
use crate::domain::{ExportPhase, TaskId};
use std::time::Duration;

/// The archive a run produced and where it went
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactInfo {
    pub file_name: String,
    pub size_bytes: u64,
    /// SHA-256, lowercase hex
    pub sha256: String,
    /// Location reported by the storage backend
    pub location: String,
}

/// Summary of one backup run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub dry_run: bool,

    /// `Done` on success, `Failed` otherwise
    pub final_phase: ExportPhase,

    /// Phase that was active when the run failed
    pub failed_phase: Option<ExportPhase>,

    /// Task enqueued by this run
    pub task_id: Option<TaskId>,

    /// Archive produced by this run (recoveries are counted separately)
    pub artifact: Option<ArtifactInfo>,

    /// The matched completion arrived more than five minutes after enqueue
    pub slow_completion: bool,

    /// Pending exports recovered from the queue
    pub recovered: usize,

    /// Entries pushed back to the queue (new failures and failed recoveries)
    pub requeued: usize,

    /// Entries dropped after exhausting their recovery attempts
    pub discarded: usize,

    pub duration: Duration,

    pub error: Option<String>,
}

impl RunSummary {
    pub fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            final_phase: ExportPhase::Idle,
            failed_phase: None,
            task_id: None,
            artifact: None,
            slow_completion: false,
            recovered: 0,
            requeued: 0,
            discarded: 0,
            duration: Duration::ZERO,
            error: None,
        }
    }

    /// Set the duration
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    pub fn is_successful(&self) -> bool {
        self.final_phase == ExportPhase::Done
    }

    /// Record a failure in `phase`
    pub fn fail(&mut self, phase: ExportPhase, error: String) {
        self.failed_phase = Some(phase);
        self.final_phase = ExportPhase::Failed;
        self.error = Some(error);
    }

    /// Log the summary
    pub fn log_summary(&self) {
        tracing::info!(
            dry_run = self.dry_run,
            final_phase = %self.final_phase,
            task_id = self.task_id.as_ref().map(|t| t.as_str()).unwrap_or("-"),
            recovered = self.recovered,
            requeued = self.requeued,
            discarded = self.discarded,
            duration_secs = self.duration.as_secs(),
            "Backup run finished"
        );

        if let Some(ref artifact) = self.artifact {
            tracing::info!(
                file = %artifact.file_name,
                size = %format_file_size(artifact.size_bytes),
                sha256 = %artifact.sha256,
                location = %artifact.location,
                "Backup artifact"
            );
        }

        if let Some(ref error) = self.error {
            tracing::error!(
                phase = %self.failed_phase.unwrap_or(ExportPhase::Failed),
                error = %error,
                "Backup run failed"
            );
        }
    }
}

impl Default for RunSummary {
    fn default() -> Self {
        Self::new(false)
    }
}
