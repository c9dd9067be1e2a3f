//! Export coordinator - orchestrator for one backup run
//!
//! This module sequences the export protocol and the collaborators around
//! it. A run moves through the phases of [`ExportPhase`]:
//!
//! ```text
//! Idle -> RecoveryDrain -> Triggering -> Polling -> MatchingNotification
//!      -> Downloading -> Storing -> Notifying -> Done
//! ```
//!
//! with `Failed` reachable from every phase except `Done`. Failures after
//! polling confirmed the task are parked in the recovery queue; failures
//! before that point are not, since the task may never have completed.

use crate::adapters::notifier::{create_notifier, Notifier};
use crate::adapters::notion::NotionClient;
use crate::adapters::queue::connect_list_store;
use crate::adapters::storage::{create_storage, BackupStorage};
use crate::config::BackupConfig;
use crate::core::export::artifact::{
    artifact_filename, checksum_file, create_dummy_export, format_file_size,
};
use crate::core::export::retry::ProtocolTimings;
use crate::core::export::summary::{ArtifactInfo, RunSummary};
use crate::core::recovery::RecoveryQueue;
use crate::domain::{
    BackupError, ExportPhase, ExportTask, ExportType, NotificationAction, PendingRecovery, Result,
};
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

const DRY_RUN_SUFFIX: &str = " (DRY RUN)";

/// Archive retrieved and stored for one confirmed task
struct AcquiredBackup {
    artifact: ArtifactInfo,
    slow_completion: bool,
}

/// Export coordinator
pub struct ExportCoordinator {
    config: BackupConfig,
    /// Absent in dry-run mode
    client: Option<NotionClient>,
    storage: Arc<dyn BackupStorage + Send + Sync>,
    notifier: Arc<dyn Notifier + Send + Sync>,
    queue: RecoveryQueue,
    phase: ExportPhase,
    /// Task confirmed by polling in the current run and not yet stored
    confirmed: Option<ExportTask>,
    work_root: PathBuf,
}

impl ExportCoordinator {
    /// Create a coordinator with collaborators built from configuration
    ///
    /// Dry runs get neither a platform client nor a recovery queue. An
    /// unreachable recovery store is not an error: the run continues
    /// without recovery.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage backend, notifier or HTTP client
    /// cannot be created.
    pub async fn new(config: BackupConfig) -> Result<Self> {
        let storage = create_storage(&config)?;
        let notifier = create_notifier(&config.notifications)?;

        let (client, queue) = if config.application.dry_run {
            (None, RecoveryQueue::disabled())
        } else {
            let client = NotionClient::new(&config, ProtocolTimings::from_config(&config))?;
            let store = connect_list_store(&config.recovery).await;
            (
                Some(client),
                RecoveryQueue::new(store, config.recovery.queue_key.clone()),
            )
        };

        tracing::info!(
            storage = storage.backend_name(),
            notifications = config.notifications.enabled,
            recovery = queue.is_available(),
            "Backup coordinator initialized"
        );

        Ok(Self::from_parts(config, client, storage, notifier, queue))
    }

    /// Assemble a coordinator from prepared collaborators
    pub fn from_parts(
        config: BackupConfig,
        client: Option<NotionClient>,
        storage: Arc<dyn BackupStorage + Send + Sync>,
        notifier: Arc<dyn Notifier + Send + Sync>,
        queue: RecoveryQueue,
    ) -> Self {
        Self {
            config,
            client,
            storage,
            notifier,
            queue,
            phase: ExportPhase::Idle,
            confirmed: None,
            work_root: std::env::temp_dir(),
        }
    }

    /// Directory under which each run creates its scratch directory
    pub fn with_work_root(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_root = dir.into();
        self
    }

    pub fn phase(&self) -> ExportPhase {
        self.phase
    }

    pub fn queue(&self) -> &RecoveryQueue {
        &self.queue
    }

    fn enter(phase: &mut ExportPhase, to: ExportPhase) {
        crate::log_phase_transition!(*phase, to);
        *phase = to;
    }

    fn client_missing() -> BackupError {
        BackupError::Configuration("platform client is not configured".to_string())
    }

    /// Execute one backup run
    ///
    /// Never returns an error: the outcome, including any failure, is
    /// recorded in the returned [`RunSummary`].
    #[tracing::instrument(name = "backup_run", skip(self), fields(dry_run = self.config.application.dry_run))]
    pub async fn run(&mut self) -> RunSummary {
        let start_time = Instant::now();
        let dry_run = self.config.application.dry_run;
        let mut summary = RunSummary::new(dry_run);
        self.phase = ExportPhase::Idle;
        self.confirmed = None;

        tracing::info!(
            storage = self.storage.backend_name(),
            export_type = %self.config.export.export_type,
            "Starting Notion backup"
        );

        let work_dir = self
            .work_root
            .join(format!("notion-backup-{}", uuid::Uuid::new_v4()));
        let outcome = match tokio::fs::create_dir_all(&work_dir).await {
            Ok(()) => self.execute(&mut summary, &work_dir).await,
            Err(e) => Err(BackupError::Io(format!(
                "Failed to create work directory {}: {}",
                work_dir.display(),
                e
            ))),
        };

        match outcome {
            Ok(()) => summary.final_phase = ExportPhase::Done,
            Err(e) => self.handle_failure(&mut summary, e).await,
        }

        if let Err(e) = tokio::fs::remove_dir_all(&work_dir).await {
            tracing::debug!(error = %e, "Work directory not removed");
        }

        let summary = summary.with_duration(start_time.elapsed());
        summary.log_summary();
        summary
    }

    async fn execute(&mut self, summary: &mut RunSummary, work_dir: &Path) -> Result<()> {
        self.preflight().await?;

        if self.config.application.dry_run {
            return self.dry_run_backup(summary, work_dir).await;
        }

        Self::enter(&mut self.phase, ExportPhase::RecoveryDrain);
        self.drain_recovery(summary, work_dir).await;

        Self::enter(&mut self.phase, ExportPhase::Triggering);
        let client = self.client.as_ref().ok_or_else(Self::client_missing)?;
        let task_id = client.enqueue_export().await?;
        summary.task_id = Some(task_id.clone());

        Self::enter(&mut self.phase, ExportPhase::Polling);
        let task = client.wait_for_completion(&task_id).await?;
        self.confirmed = Some(task.clone());

        let acquired = self.acquire(&task, work_dir).await?;
        self.confirmed = None;
        summary.slow_completion = acquired.slow_completion;

        self.after_store().await;

        Self::enter(&mut self.phase, ExportPhase::Notifying);
        self.notify_success(&acquired.artifact, false).await;
        summary.artifact = Some(acquired.artifact);

        Self::enter(&mut self.phase, ExportPhase::Done);
        Ok(())
    }

    /// Storage must answer before anything is exported; the notifier is
    /// only checked
    async fn preflight(&self) -> Result<()> {
        tracing::info!("Testing connections");

        match self.storage.test_connection().await {
            Ok(message) => tracing::info!(message = %message, "Storage connection OK"),
            Err(e) => {
                tracing::error!(error = %e, "Storage connection failed");
                return Err(e);
            }
        }

        if self.config.notifications.enabled {
            match self.notifier.test_connection().await {
                Ok(message) => tracing::info!(message = %message, "Notification connection OK"),
                Err(e) => tracing::warn!(error = %e, "Notification connection failed"),
            }
        }

        Ok(())
    }

    /// Replay every pending export once
    ///
    /// Entries that used up their attempts are dropped. A failed attempt is
    /// pushed back with its retry count incremented.
    async fn drain_recovery(&mut self, summary: &mut RunSummary, work_dir: &Path) {
        let entries = self.queue.drain_all().await;
        if entries.is_empty() {
            return;
        }

        tracing::info!(count = entries.len(), "Processing pending exports");
        for entry in entries {
            if entry.is_exhausted() {
                tracing::warn!(
                    task_id = %entry.task_id,
                    retry_count = entry.retry_count,
                    "Discarding pending export after maximum recovery attempts"
                );
                summary.discarded += 1;
                continue;
            }

            tracing::info!(
                task_id = %entry.task_id,
                retry_count = entry.retry_count,
                "Recovering pending export"
            );
            match self.acquire(&entry.as_task(), work_dir).await {
                Ok(acquired) => {
                    summary.recovered += 1;
                    self.after_store().await;
                    self.notify_success(&acquired.artifact, true).await;
                }
                Err(e) => {
                    let next = entry.next_attempt();
                    tracing::warn!(
                        task_id = %entry.task_id,
                        retry_count = next.retry_count,
                        error = %e,
                        "Recovery attempt failed"
                    );
                    if self.queue.push(&next).await {
                        summary.requeued += 1;
                    }
                }
            }
            Self::enter(&mut self.phase, ExportPhase::RecoveryDrain);
        }
    }

    /// Matching, download and store for a task the platform has completed
    async fn acquire(&mut self, task: &ExportTask, work_dir: &Path) -> Result<AcquiredBackup> {
        let client = self.client.as_mut().ok_or_else(Self::client_missing)?;

        Self::enter(&mut self.phase, ExportPhase::MatchingNotification);
        let found = client.locate_export(task).await?;

        Self::enter(&mut self.phase, ExportPhase::Downloading);
        let export = &self.config.export;
        let file_name = artifact_filename(
            &export.filename_prefix,
            export.export_type,
            export.flatten_export_filetree,
            Utc::now(),
        );
        let downloaded = client.download(&found.link, work_dir, &file_name).await?;
        tracing::info!(
            file = %file_name,
            size = %format_file_size(downloaded.size_bytes),
            "Export completed"
        );

        Self::enter(&mut self.phase, ExportPhase::Storing);
        let stored = self.storage.store(&downloaded.path, &file_name).await?;
        tracing::info!(location = %stored.location, "Backup stored");

        Ok(AcquiredBackup {
            artifact: ArtifactInfo {
                file_name,
                size_bytes: downloaded.size_bytes,
                sha256: downloaded.sha256,
                location: stored.location,
            },
            slow_completion: found.slow_completion,
        })
    }

    async fn dry_run_backup(&mut self, summary: &mut RunSummary, work_dir: &Path) -> Result<()> {
        tracing::info!("Dry run: creating dummy export, skipping platform calls");

        Self::enter(&mut self.phase, ExportPhase::Downloading);
        let export = &self.config.export;
        let now = Utc::now();
        let file_name = artifact_filename(
            &export.filename_prefix,
            export.export_type,
            export.flatten_export_filetree,
            now,
        );
        let path = create_dummy_export(
            work_dir,
            &file_name,
            export,
            self.storage.backend_name(),
            now,
        )?;
        let sha256 = checksum_file(&path).await?;
        let size_bytes = tokio::fs::metadata(&path).await?.len();

        Self::enter(&mut self.phase, ExportPhase::Storing);
        let stored = self.storage.store(&path, &file_name).await?;

        self.after_store().await;

        let artifact = ArtifactInfo {
            file_name,
            size_bytes,
            sha256,
            location: stored.location,
        };

        Self::enter(&mut self.phase, ExportPhase::Notifying);
        self.notify_success(&artifact, false).await;
        summary.artifact = Some(artifact);

        Self::enter(&mut self.phase, ExportPhase::Done);
        Ok(())
    }

    /// Retention cleanup and notification state update, both best-effort
    async fn after_store(&mut self) {
        if let Some(keep) = self.config.storage.max_backups {
            match self.storage.cleanup_old(keep).await {
                Ok(report) => tracing::info!(message = %report.message(keep), "Retention cleanup"),
                Err(e) => tracing::warn!(error = %e, "Retention cleanup failed"),
            }
        }

        let action = self.config.export.notification_action;
        if action == NotificationAction::None {
            return;
        }
        if let Some(client) = self.client.as_mut() {
            match client.update_notification(action).await {
                Ok(true) => {}
                Ok(false) => tracing::debug!("No notification to update"),
                Err(e) => tracing::warn!(
                    action = action.as_str(),
                    error = %e,
                    "Failed to update notification state"
                ),
            }
        }
    }

    async fn handle_failure(&mut self, summary: &mut RunSummary, error: BackupError) {
        let failed_in = self.phase;

        if let Some(task) = self.confirmed.take() {
            if failed_in.is_post_confirmation() && error.is_recovery_eligible() {
                if self.queue.push(&PendingRecovery::new(&task)).await {
                    summary.requeued += 1;
                }
            } else {
                tracing::info!(
                    task_id = %task.task_id,
                    phase = %failed_in,
                    "Failure is not recovery-eligible, export will not be retried"
                );
            }
        }

        Self::enter(&mut self.phase, ExportPhase::Failed);
        tracing::error!(phase = %failed_in, error = %error, "Backup failed");
        summary.fail(failed_in, error.to_string());

        let title = self.title("Backup Failed");
        let body = failure_body(&error, failed_in);
        if let Err(e) = self.notifier.send_error(&title, &body).await {
            tracing::warn!(error = %e, "Failed to send error notification");
        }
    }

    async fn notify_success(&self, artifact: &ArtifactInfo, recovered: bool) {
        let title = self.title(if recovered {
            "Recovered Backup Completed"
        } else {
            "Backup Completed Successfully"
        });
        let body = success_body(
            artifact,
            self.storage.backend_name(),
            self.config.export.export_type,
            self.config.application.dry_run,
        );
        if let Err(e) = self.notifier.send_success(&title, &body).await {
            tracing::warn!(error = %e, "Failed to send success notification");
        }
    }

    fn title(&self, base: &str) -> String {
        if self.config.application.dry_run {
            format!("{base}{DRY_RUN_SUFFIX}")
        } else {
            base.to_string()
        }
    }
}

/// Body of the success notification
pub fn success_body(
    artifact: &ArtifactInfo,
    storage_backend: &str,
    export_type: ExportType,
    dry_run: bool,
) -> String {
    let mode = if dry_run {
        "MODE: DRY RUN (Dummy Export File)\n\n"
    } else {
        ""
    };
    format!(
        "Notion workspace backup completed successfully!\n\n\
         {mode}File: {}\n\
         Size: {}\n\
         Storage: {}\n\
         Location: {}\n\
         Export Type: {}\n\
         SHA-256: {}",
        artifact.file_name,
        format_file_size(artifact.size_bytes),
        storage_backend,
        artifact.location,
        export_type,
        artifact.sha256
    )
}

/// Body of the failure notification
pub fn failure_body(error: &BackupError, phase: ExportPhase) -> String {
    format!(
        "Notion workspace backup failed!\n\n\
         Error: {error}\n\
         Phase: {phase}\n\
         Please check the logs for more details."
    )
}
