//! Authenticated session against the platform's internal API
//!
//! One `NotionClient` is owned by the orchestrator for the whole run. It
//! carries the session cookies, applies the per-phase retry policies, and
//! remembers the notification matched for the current export so it can be
//! updated once the archive is safely stored.

use super::models::{
    EnqueueTaskRequest, EnqueueTaskResponse, GetTasksRequest, GetTasksResponse,
    NotificationLogRequest, NotificationLogResponse, SaveTransactionsRequest,
};
use crate::config::{BackupConfig, ExportConfig, SecretString};
use crate::core::export::matcher::{match_completion, CompletionMatch};
use crate::core::export::retry::ProtocolTimings;
use crate::core::export::artifact::StreamingChecksum;
use crate::domain::{
    BackupError, ExportTask, FeedSnapshot, NotificationAction, NotificationId, NotionError,
    Result, TaskId,
};
use crate::logging::mask::mask_url;
use futures::StreamExt;
use reqwest::header::{CONTENT_TYPE, COOKIE};
use reqwest::{Client, StatusCode};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;

const ENQUEUE_TASK: &str = "enqueueTask";
const GET_TASKS: &str = "getTasks";
const NOTIFICATION_LOG: &str = "getNotificationLogV2";
const SAVE_TRANSACTIONS: &str = "saveTransactionsMain";

const TOKEN_V2_COOKIE: &str = "token_v2";
const FILE_TOKEN_COOKIE: &str = "file_token";

/// Largest block written to disk per call; network chunks are re-sliced to it
pub const DOWNLOAD_CHUNK_SIZE: usize = 8 * 1024;

/// Progress is logged each time another 10 MB has arrived
const PROGRESS_STEP_BYTES: u64 = 10 * 1024 * 1024;

/// An archive written to local storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedArtifact {
    pub path: PathBuf,
    pub size_bytes: u64,
    /// SHA-256 of the written bytes, lowercase hex
    pub sha256: String,
}

/// Client for the export protocol
///
/// # Example
///
/// ```no_run
/// use notion_backup::adapters::notion::NotionClient;
/// use notion_backup::config::load_config;
/// use notion_backup::core::export::retry::ProtocolTimings;
///
/// # async fn example() -> notion_backup::domain::Result<()> {
/// let config = load_config("notion-backup.toml")?;
/// let client = NotionClient::new(&config, ProtocolTimings::from_config(&config))?;
/// let task_id = client.enqueue_export().await?;
/// let task = client.wait_for_completion(&task_id).await?;
/// # Ok(())
/// # }
/// ```
pub struct NotionClient {
    http: Client,
    base_url: String,
    space_id: String,
    token_v2: SecretString,
    file_token: SecretString,
    export: ExportConfig,
    timings: ProtocolTimings,
    tracked_notification: Option<NotificationId>,
}

impl NotionClient {
    /// Create a client from configuration
    ///
    /// # Errors
    ///
    /// Returns `BackupError::Configuration` if the HTTP client cannot be
    /// built.
    pub fn new(config: &BackupConfig, timings: ProtocolTimings) -> Result<Self> {
        let http = Client::builder()
            .user_agent(config.notion.user_agent.clone())
            .timeout(timings.request_timeout)
            .connect_timeout(Duration::from_secs(30).min(timings.request_timeout))
            .build()
            .map_err(|e| BackupError::Configuration(format!("Failed to build HTTP client: {e}")))?;

        tracing::info!(
            base_url = %config.notion.base_url,
            space_id = %config.notion.space_id,
            "Notion client initialized"
        );

        Ok(Self {
            http,
            base_url: config.notion.base_url.trim_end_matches('/').to_string(),
            space_id: config.notion.space_id.clone(),
            token_v2: config.notion.token_v2.clone(),
            file_token: config.notion.file_token.clone(),
            export: config.export.clone(),
            timings,
            tracked_notification: None,
        })
    }

    fn endpoint(&self, name: &str) -> String {
        format!("{}/api/v3/{}", self.base_url, name)
    }

    fn api_cookie(&self) -> String {
        format!(
            "{}={}; {}={}",
            TOKEN_V2_COOKIE,
            self.token_v2.expose_secret().as_ref(),
            FILE_TOKEN_COOKIE,
            self.file_token.expose_secret().as_ref()
        )
    }

    fn file_cookie(&self) -> String {
        format!(
            "{}={}",
            FILE_TOKEN_COOKIE,
            self.file_token.expose_secret().as_ref()
        )
    }

    /// POST a JSON body and classify the response status
    ///
    /// 429 becomes `RateLimited`; transport errors and any other non-200
    /// status become `Transient`.
    async fn post_json<B: Serialize>(&self, name: &str, body: &B) -> Result<reqwest::Response> {
        let response = self
            .http
            .post(self.endpoint(name))
            .header(COOKIE, self.api_cookie())
            .header(CONTENT_TYPE, "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| NotionError::Transient(format!("{name}: {}", e.without_url())))?;

        match response.status() {
            StatusCode::OK => Ok(response),
            StatusCode::TOO_MANY_REQUESTS => Err(NotionError::RateLimited(name.to_string()).into()),
            status => Err(NotionError::Transient(format!("{name} returned HTTP {status}")).into()),
        }
    }

    async fn read_json<T: DeserializeOwned>(name: &str, response: reqwest::Response) -> Result<T> {
        response.json::<T>().await.map_err(|e| {
            NotionError::Transient(format!("{name}: unreadable response body: {}", e.without_url()))
                .into()
        })
    }

    /// Start a whole-workspace export
    ///
    /// Retries transport failures and non-200 responses with a fixed delay.
    ///
    /// # Errors
    ///
    /// - `NotionError::RateLimited` immediately on HTTP 429
    /// - `NotionError::Transient` once the attempt budget is spent
    pub async fn enqueue_export(&self) -> Result<TaskId> {
        let request = EnqueueTaskRequest::export_space(&self.space_id, &self.export);
        let max_attempts = self.timings.enqueue.max_attempts;

        let task_id = self
            .timings
            .enqueue
            .run("enqueue_export", |attempt| {
                let request = &request;
                async move {
                    let response = self.post_json(ENQUEUE_TASK, request).await?;
                    let body: EnqueueTaskResponse = Self::read_json(ENQUEUE_TASK, response).await?;
                    match body.task_id.map(TaskId::new) {
                        Some(Ok(task_id)) => Ok(Some(task_id)),
                        _ => {
                            tracing::warn!(attempt, "Enqueue response carried no task id");
                            Ok(None)
                        }
                    }
                }
            })
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to trigger export task");
                e
            })?;

        match task_id {
            Some(task_id) => {
                tracing::info!(task_id = %task_id, "Export task enqueued");
                Ok(task_id)
            }
            None => Err(NotionError::Transient(format!(
                "no task id returned after {max_attempts} attempts"
            ))
            .into()),
        }
    }

    /// Poll the task until it reaches a terminal state
    ///
    /// Rate limiting, non-200 responses, transport errors and non-terminal
    /// states all just wait for the next interval. Only the time spent
    /// waiting counts against the ceiling.
    ///
    /// # Errors
    ///
    /// - `NotionError::TaskFailed` when the platform reports failure
    /// - `NotionError::InvalidResponse` when success carries no timestamp
    /// - `NotionError::TaskTimeout` when the ceiling is reached
    pub async fn wait_for_completion(&self, task_id: &TaskId) -> Result<ExportTask> {
        let request = GetTasksRequest {
            task_ids: [task_id.as_str()],
        };
        let mut waited = Duration::ZERO;

        while waited < self.timings.poll_timeout {
            match self.poll_once(&request).await {
                Ok(Some(status)) => match status.state.as_deref() {
                    Some("success") => {
                        let Some(enqueued_at) = status.enqueued_at_ms() else {
                            tracing::error!(task_id = %task_id, "Task succeeded without a completion timestamp");
                            return Err(NotionError::InvalidResponse(format!(
                                "task {task_id} succeeded without equeuedAt"
                            ))
                            .into());
                        };
                        tracing::info!(task_id = %task_id, enqueued_at, "Export task completed");
                        return Ok(ExportTask {
                            task_id: task_id.clone(),
                            enqueued_at,
                        });
                    }
                    Some("failure") => {
                        tracing::error!(task_id = %task_id, "Export task failed on the platform");
                        return Err(NotionError::TaskFailed(task_id.to_string()).into());
                    }
                    state => {
                        tracing::info!(
                            task_id = %task_id,
                            state = state.unwrap_or("unknown"),
                            "Task not finished, continuing to poll"
                        );
                    }
                },
                Ok(None) => tracing::debug!(task_id = %task_id, "Task status response had no results"),
                Err(BackupError::Notion(NotionError::RateLimited(_))) => {
                    tracing::warn!(task_id = %task_id, "Rate limited while polling task status");
                }
                Err(e) => tracing::warn!(task_id = %task_id, error = %e, "Error polling task status"),
            }

            tokio::time::sleep(self.timings.poll_interval).await;
            waited += self.timings.poll_interval;
            tracing::info!(
                task_id = %task_id,
                waited_secs = waited.as_secs(),
                "Waiting for export task to complete"
            );
        }

        tracing::error!(
            task_id = %task_id,
            timeout_secs = self.timings.poll_timeout.as_secs(),
            "Export task did not complete in time"
        );
        Err(NotionError::TaskTimeout {
            task_id: task_id.to_string(),
            seconds: self.timings.poll_timeout.as_secs(),
        }
        .into())
    }

    async fn poll_once(
        &self,
        request: &GetTasksRequest<'_>,
    ) -> Result<Option<super::models::TaskStatus>> {
        let response = self.post_json(GET_TASKS, request).await?;
        let body: GetTasksResponse = Self::read_json(GET_TASKS, response).await?;
        tracing::debug!(results = body.results.len(), "Task polling response");
        Ok(body.results.into_iter().next())
    }

    /// Fetch one bounded snapshot of the notification feed
    ///
    /// This is a single retrieval; retrying belongs to the caller.
    ///
    /// # Errors
    ///
    /// - `NotionError::RateLimited` on HTTP 429
    /// - `NotionError::Transient` on any other failure
    pub async fn fetch_feed(&self) -> Result<FeedSnapshot> {
        let request =
            NotificationLogRequest::read_and_unread(&self.space_id, self.export.feed_page_size);
        let response = self.post_json(NOTIFICATION_LOG, &request).await?;
        let body: NotificationLogResponse = Self::read_json(NOTIFICATION_LOG, response).await?;
        let snapshot = body.into_snapshot();
        tracing::debug!(
            activities = snapshot.activities.len(),
            notifications = snapshot.notifications.len(),
            "Notification feed snapshot received"
        );
        Ok(snapshot)
    }

    /// Find the download link for a confirmed export
    ///
    /// Fetches the feed and runs the completion matcher until a link turns up
    /// or the matching budget is spent. The matched notification is kept for
    /// [`NotionClient::update_notification`].
    ///
    /// # Errors
    ///
    /// - `NotionError::RateLimited` as soon as the feed answers 429
    /// - `NotionError::NoMatch` when no attempt produced a link
    pub async fn locate_export(&mut self, task: &ExportTask) -> Result<CompletionMatch> {
        let this: &Self = self;
        let enqueued_at = task.enqueued_at;
        let max_attempts = this.timings.matching.max_attempts;

        let outcome = this
            .timings
            .matching
            .run("locate_export", |attempt| async move {
                let snapshot = this.fetch_feed().await?;
                if snapshot.activities.is_empty() {
                    tracing::info!(attempt, "No activities in feed yet");
                    return Ok(None);
                }
                Ok(match_completion(&snapshot, enqueued_at))
            })
            .await;

        let found = match outcome {
            Ok(Some(found)) => found,
            Ok(None) => {
                return Err(NotionError::NoMatch(format!(
                    "task {} produced no download link after {} attempts",
                    task.task_id, max_attempts
                ))
                .into())
            }
            Err(e) if e.is_retryable() => {
                return Err(NotionError::NoMatch(format!(
                    "task {} produced no download link after {} attempts (last error: {})",
                    task.task_id, max_attempts, e
                ))
                .into())
            }
            Err(e) => return Err(e),
        };

        tracing::info!(
            task_id = %task.task_id,
            activity_id = %found.activity_id,
            link = %mask_url(&found.link),
            "Download link obtained"
        );
        self.tracked_notification = found.notification_id.clone();
        Ok(found)
    }

    /// Stream the archive at `link` into `dest_dir/filename`
    ///
    /// # Errors
    ///
    /// Returns `BackupError::Download` on any transport, status or write
    /// failure. A partially written file is left in place.
    pub async fn download(
        &self,
        link: &str,
        dest_dir: &Path,
        filename: &str,
    ) -> Result<DownloadedArtifact> {
        let path = dest_dir.join(filename);
        let masked = mask_url(link);
        tracing::info!(file = %filename, source = %masked, "Downloading export archive");

        let response = self
            .http
            .get(link)
            .header(COOKIE, self.file_cookie())
            .timeout(self.timings.download_timeout)
            .send()
            .await
            .map_err(|e| BackupError::Download(format!("request to {masked} failed: {}", e.without_url())))?;

        if !response.status().is_success() {
            return Err(BackupError::Download(format!(
                "{masked} returned HTTP {}",
                response.status()
            )));
        }

        let total = response.content_length().unwrap_or(0);
        let write_err = |e: std::io::Error| {
            BackupError::Download(format!("failed to write {}: {}", path.display(), e))
        };

        let mut file = tokio::fs::File::create(&path).await.map_err(write_err)?;
        let mut checksum = StreamingChecksum::new();
        let mut downloaded: u64 = 0;
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| {
                BackupError::Download(format!("stream from {masked} failed: {}", e.without_url()))
            })?;
            for block in chunk.chunks(DOWNLOAD_CHUNK_SIZE) {
                file.write_all(block).await.map_err(write_err)?;
                checksum.update(block);
            }

            let before = downloaded;
            downloaded += chunk.len() as u64;
            if total > 0 && downloaded / PROGRESS_STEP_BYTES > before / PROGRESS_STEP_BYTES {
                tracing::info!(
                    downloaded,
                    total,
                    percent = %format!("{:.1}", downloaded as f64 / total as f64 * 100.0),
                    "Download progress"
                );
            }
        }

        file.flush().await.map_err(write_err)?;

        tracing::info!(file = %filename, size_bytes = downloaded, "Download completed");
        Ok(DownloadedArtifact {
            path,
            size_bytes: downloaded,
            sha256: checksum.finalize(),
        })
    }

    /// Notification matched by the last successful [`NotionClient::locate_export`]
    pub fn tracked_notification(&self) -> Option<&NotificationId> {
        self.tracked_notification.as_ref()
    }

    /// Apply a read/archive state change to the tracked notification
    ///
    /// Returns `Ok(false)` when there is nothing to do. The tracked id is
    /// cleared after a successful update.
    ///
    /// # Errors
    ///
    /// Propagates the classified request failure; callers treat it as
    /// best-effort.
    pub async fn update_notification(&mut self, action: NotificationAction) -> Result<bool> {
        let Some(notification_id) = self.tracked_notification.clone() else {
            return Ok(false);
        };
        let now_ms = chrono::Utc::now().timestamp_millis();
        let Some(request) = SaveTransactionsRequest::notification_update(
            &self.space_id,
            &notification_id,
            action,
            now_ms,
        ) else {
            return Ok(false);
        };

        self.post_json(SAVE_TRANSACTIONS, &request).await?;
        tracing::info!(
            notification_id = %notification_id,
            action = action.as_str(),
            "Notification state updated"
        );
        self.tracked_notification = None;
        Ok(true)
    }
}
