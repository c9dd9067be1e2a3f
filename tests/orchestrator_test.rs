//! End-to-end tests for a backup run
//!
//! The export platform is a mockito server, storage is a local directory,
//! and the recovery queue sits on the in-memory list store. The client's
//! retry and polling rules are also exercised directly against the same
//! server.

use async_trait::async_trait;
use mockito::{Matcher, Server, ServerGuard};
use notion_backup::adapters::notifier::Notifier;
use notion_backup::adapters::notion::NotionClient;
use notion_backup::adapters::queue::{ListStore, MemoryListStore};
use notion_backup::adapters::storage::{BackupStorage, LocalStorage};
use notion_backup::config::{load_config_str, BackupConfig, LocalStorageConfig};
use notion_backup::core::export::{ExportCoordinator, ProtocolTimings, RetryPolicy};
use notion_backup::core::recovery::RecoveryQueue;
use notion_backup::domain::{
    ExportPhase, ExportTask, NotificationAction, PendingRecovery, Result, TaskId,
};
use serde_json::json;
use sha2::{Digest, Sha256};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

const QUEUE_KEY: &str = "notion_backup_recovery_queue";
const ENQUEUED_AT: i64 = 1_700_000_000_000;
const ARCHIVE: &[u8] = b"PK\x03\x04 pretend this is a workspace export";

#[derive(Default)]
struct RecordingNotifier {
    sent: Mutex<Vec<(String, String, String)>>,
}

impl RecordingNotifier {
    fn titles(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|(_, title, _)| title.clone())
            .collect()
    }

    fn levels(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|(level, _, _)| level.clone())
            .collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_success(&self, title: &str, body: &str) -> Result<()> {
        self.sent
            .lock()
            .unwrap()
            .push(("success".into(), title.into(), body.into()));
        Ok(())
    }

    async fn send_error(&self, title: &str, body: &str) -> Result<()> {
        self.sent
            .lock()
            .unwrap()
            .push(("error".into(), title.into(), body.into()));
        Ok(())
    }

    async fn test_connection(&self) -> Result<String> {
        Ok("recording".into())
    }
}

fn fast_timings() -> ProtocolTimings {
    ProtocolTimings {
        request_timeout: Duration::from_secs(5),
        enqueue: RetryPolicy::fixed(3, Duration::from_millis(5)),
        poll_interval: Duration::from_millis(5),
        poll_timeout: Duration::from_millis(200),
        matching: RetryPolicy::exponential(3, Duration::from_millis(5), Duration::from_millis(10)),
        download_timeout: Duration::from_secs(5),
    }
}

fn config_for(server_url: &str, storage_dir: &TempDir, extra: &str) -> BackupConfig {
    load_config_str(&format!(
        r#"
[notion]
base_url = "{server_url}"
space_id = "space-1"
token_v2 = "v2-secret"
file_token = "file-secret"

[storage.local]
path = "{}"

{extra}
"#,
        storage_dir.path().display()
    ))
    .unwrap()
}

struct Harness {
    server: ServerGuard,
    storage_dir: TempDir,
    work_dir: TempDir,
    store: Arc<MemoryListStore>,
    notifier: Arc<RecordingNotifier>,
}

impl Harness {
    async fn new() -> Self {
        Self {
            server: Server::new_async().await,
            storage_dir: TempDir::new().unwrap(),
            work_dir: TempDir::new().unwrap(),
            store: Arc::new(MemoryListStore::new()),
            notifier: Arc::new(RecordingNotifier::default()),
        }
    }

    fn queue(&self) -> RecoveryQueue {
        let store: Arc<dyn ListStore> = self.store.clone();
        RecoveryQueue::new(Some(store), QUEUE_KEY)
    }

    fn coordinator(&self, extra_config: &str) -> ExportCoordinator {
        let config = config_for(&self.server.url(), &self.storage_dir, extra_config);
        let client = if config.application.dry_run {
            None
        } else {
            Some(NotionClient::new(&config, fast_timings()).unwrap())
        };
        let storage: Arc<dyn BackupStorage + Send + Sync> = Arc::new(
            LocalStorage::new(
                &LocalStorageConfig {
                    path: self.storage_dir.path().display().to_string(),
                },
                config.export.filename_prefix.clone(),
            )
            .unwrap(),
        );
        let queue = if config.application.dry_run {
            RecoveryQueue::disabled()
        } else {
            self.queue()
        };
        ExportCoordinator::from_parts(config, client, storage, self.notifier.clone(), queue)
            .with_work_root(self.work_dir.path())
    }

    fn client(&self) -> NotionClient {
        let config = config_for(&self.server.url(), &self.storage_dir, "");
        NotionClient::new(&config, fast_timings()).unwrap()
    }

    async fn mock_enqueue_ok(&mut self) -> mockito::Mock {
        self.server
            .mock("POST", "/api/v3/enqueueTask")
            .match_header("cookie", "token_v2=v2-secret; file_token=file-secret")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!({ "taskId": "task-1" }).to_string())
            .create_async()
            .await
    }

    async fn mock_enqueue_rate_limited(&mut self) -> mockito::Mock {
        self.server
            .mock("POST", "/api/v3/enqueueTask")
            .with_status(429)
            .expect(1)
            .create_async()
            .await
    }

    async fn mock_task_state(&mut self, state: &str) -> mockito::Mock {
        self.server
            .mock("POST", "/api/v3/getTasks")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({ "results": [{ "id": "task-1", "state": state, "equeuedAt": ENQUEUED_AT }] })
                    .to_string(),
            )
            .create_async()
            .await
    }

    async fn mock_feed(&mut self, download_path: &str) -> mockito::Mock {
        let link = format!("{}{}", self.server.url(), download_path);
        self.server
            .mock("POST", "/api/v3/getNotificationLogV2")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "recordMap": {
                        "activity": {
                            "old": { "value": {
                                "id": "old", "type": "export-completed",
                                "start_time": ENQUEUED_AT - 60_000,
                                "edits": [{ "link": format!("{}/stale.zip", self.server.url()) }]
                            }},
                            "act-1": { "value": {
                                "id": "act-1", "type": "export-completed",
                                "start_time": ENQUEUED_AT + 2_000,
                                "edits": [{ "link": link }]
                            }},
                            "other": { "value": { "id": "other", "type": "commented", "start_time": ENQUEUED_AT + 1_000 } }
                        },
                        "notification": {
                            "n-1": { "value": { "id": "n-1", "activity_id": "act-1" } }
                        }
                    },
                    "notificationIds": ["n-1"]
                })
                .to_string(),
            )
            .create_async()
            .await
    }

    async fn mock_download(&mut self, path: &str, status: usize) -> mockito::Mock {
        let mock = self
            .server
            .mock("GET", path)
            .match_header("cookie", "file_token=file-secret")
            .with_status(status);
        if status == 200 {
            mock.with_body(ARCHIVE).create_async().await
        } else {
            mock.create_async().await
        }
    }

    fn stored_files(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.storage_dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
}

fn confirmed_task() -> ExportTask {
    ExportTask {
        task_id: TaskId::new("task-1").unwrap(),
        enqueued_at: ENQUEUED_AT,
    }
}

fn pending(task: &str, retry_count: u32) -> PendingRecovery {
    PendingRecovery {
        task_id: TaskId::new(task).unwrap(),
        enqueued_at: ENQUEUED_AT,
        retry_count,
    }
}

#[tokio::test]
async fn test_successful_backup_stores_archive_and_updates_notification() {
    let mut h = Harness::new().await;
    let enqueue = h.mock_enqueue_ok().await;
    let _tasks = h.mock_task_state("success").await;
    let _feed = h.mock_feed("/exports/export.zip").await;
    let download = h.mock_download("/exports/export.zip", 200).await;
    let archive_update = h
        .server
        .mock("POST", "/api/v3/saveTransactionsMain")
        .match_body(Matcher::Regex(r#""id":"n-1""#.to_string()))
        .with_status(200)
        .with_body("{}")
        .expect(1)
        .create_async()
        .await;

    let mut coordinator = h.coordinator("[export]\nnotification_action = \"archive\"\n");
    let summary = coordinator.run().await;

    assert!(summary.is_successful(), "error: {:?}", summary.error);
    assert_eq!(coordinator.phase(), ExportPhase::Done);
    assert_eq!(summary.task_id.as_ref().map(|t| t.as_str()), Some("task-1"));
    assert!(!summary.slow_completion);

    let artifact = summary.artifact.expect("artifact recorded");
    assert!(artifact.file_name.starts_with("notion-export-markdown_"));
    assert_eq!(artifact.size_bytes, ARCHIVE.len() as u64);
    assert_eq!(artifact.sha256, format!("{:x}", Sha256::digest(ARCHIVE)));
    assert_eq!(h.stored_files(), vec![artifact.file_name.clone()]);

    assert!(h.queue().pending().await.is_empty());
    assert_eq!(h.notifier.titles(), vec!["Backup Completed Successfully"]);

    enqueue.assert_async().await;
    download.assert_async().await;
    archive_update.assert_async().await;
}

#[tokio::test]
async fn test_rate_limited_enqueue_fails_without_queueing() {
    let mut h = Harness::new().await;
    let enqueue = h.mock_enqueue_rate_limited().await;

    let mut coordinator = h.coordinator("");
    let summary = coordinator.run().await;

    assert!(!summary.is_successful());
    assert_eq!(summary.failed_phase, Some(ExportPhase::Triggering));
    assert!(summary.error.unwrap().contains("Rate limit"));
    assert_eq!(summary.requeued, 0);
    assert!(h.queue().pending().await.is_empty());
    assert_eq!(h.notifier.levels(), vec!["error"]);
    assert_eq!(h.notifier.titles(), vec!["Backup Failed"]);

    enqueue.assert_async().await;
}

#[tokio::test]
async fn test_failed_task_is_not_queued() {
    let mut h = Harness::new().await;
    let _enqueue = h.mock_enqueue_ok().await;
    let _tasks = h.mock_task_state("failure").await;

    let summary = h.coordinator("").run().await;

    assert_eq!(summary.failed_phase, Some(ExportPhase::Polling));
    assert!(h.queue().pending().await.is_empty());
}

#[tokio::test]
async fn test_poll_timeout_is_not_queued() {
    let mut h = Harness::new().await;
    let _enqueue = h.mock_enqueue_ok().await;
    let _tasks = h.mock_task_state("in_progress").await;

    let summary = h.coordinator("").run().await;

    assert_eq!(summary.failed_phase, Some(ExportPhase::Polling));
    assert!(summary.error.unwrap().contains("did not complete"));
    assert!(h.queue().pending().await.is_empty());
}

#[tokio::test]
async fn test_download_failure_parks_task_for_recovery() {
    let mut h = Harness::new().await;
    let _enqueue = h.mock_enqueue_ok().await;
    let _tasks = h.mock_task_state("success").await;
    let _feed = h.mock_feed("/exports/broken.zip").await;
    let _download = h.mock_download("/exports/broken.zip", 500).await;

    let summary = h.coordinator("").run().await;

    assert_eq!(summary.failed_phase, Some(ExportPhase::Downloading));
    assert_eq!(summary.requeued, 1);
    assert_eq!(h.queue().pending().await, vec![pending("task-1", 0)]);
    assert!(h.stored_files().is_empty());
}

#[tokio::test]
async fn test_missing_completion_parks_task_for_recovery() {
    let mut h = Harness::new().await;
    let _enqueue = h.mock_enqueue_ok().await;
    let _tasks = h.mock_task_state("success").await;
    let feed = h
        .server
        .mock("POST", "/api/v3/getNotificationLogV2")
        .with_status(200)
        .with_body(json!({ "recordMap": { "activity": {}, "notification": {} } }).to_string())
        .expect(3)
        .create_async()
        .await;

    let summary = h.coordinator("").run().await;

    assert_eq!(summary.failed_phase, Some(ExportPhase::MatchingNotification));
    assert!(summary.error.unwrap().contains("No matching"));
    assert_eq!(h.queue().pending().await, vec![pending("task-1", 0)]);
    feed.assert_async().await;
}

#[tokio::test]
async fn test_recovery_stores_pending_export_before_new_run() {
    let mut h = Harness::new().await;
    h.queue().push(&pending("task-1", 1)).await;
    let _feed = h.mock_feed("/exports/recovered.zip").await;
    let _download = h.mock_download("/exports/recovered.zip", 200).await;
    let _enqueue = h.mock_enqueue_rate_limited().await;

    let summary = h.coordinator("").run().await;

    assert_eq!(summary.recovered, 1);
    assert_eq!(summary.failed_phase, Some(ExportPhase::Triggering));
    assert_eq!(h.stored_files().len(), 1);
    assert!(h.queue().pending().await.is_empty());
    assert_eq!(
        h.notifier.titles(),
        vec!["Recovered Backup Completed", "Backup Failed"]
    );
}

#[tokio::test]
async fn test_failed_recovery_is_requeued_then_discarded() {
    let mut h = Harness::new().await;
    h.queue().push(&pending("task-1", 2)).await;
    let _feed = h.mock_feed("/exports/gone.zip").await;
    let _download = h.mock_download("/exports/gone.zip", 403).await;
    let _enqueue = h
        .server
        .mock("POST", "/api/v3/enqueueTask")
        .with_status(429)
        .create_async()
        .await;

    let first = h.coordinator("").run().await;
    assert_eq!(first.requeued, 1);
    assert_eq!(first.recovered, 0);
    assert_eq!(h.queue().pending().await, vec![pending("task-1", 3)]);

    let second = h.coordinator("").run().await;
    assert_eq!(second.discarded, 1);
    assert_eq!(second.requeued, 0);
    assert!(h.queue().pending().await.is_empty());
}

#[tokio::test]
async fn test_unreachable_queue_does_not_change_outcome() {
    let mut h = Harness::new().await;
    h.store.set_offline(true);
    let _enqueue = h.mock_enqueue_ok().await;
    let _tasks = h.mock_task_state("success").await;
    let _feed = h.mock_feed("/exports/broken.zip").await;
    let _download = h.mock_download("/exports/broken.zip", 500).await;

    let summary = h.coordinator("").run().await;

    assert_eq!(summary.failed_phase, Some(ExportPhase::Downloading));
    assert_eq!(summary.requeued, 0);
    assert_eq!(h.notifier.levels(), vec!["error"]);
}

#[tokio::test]
async fn test_dry_run_stores_dummy_archive_without_platform_calls() {
    let mut h = Harness::new().await;
    let enqueue = h
        .server
        .mock("POST", Matcher::Any)
        .expect(0)
        .create_async()
        .await;
    h.queue().push(&pending("task-1", 0)).await;

    let mut coordinator = h.coordinator("[application]\ndry_run = true\n");
    assert!(!coordinator.queue().is_available());
    let summary = coordinator.run().await;

    assert!(summary.is_successful(), "error: {:?}", summary.error);
    assert!(summary.dry_run);
    let artifact = summary.artifact.expect("artifact recorded");
    assert_eq!(h.stored_files(), vec![artifact.file_name]);
    assert_eq!(
        h.notifier.titles(),
        vec!["Backup Completed Successfully (DRY RUN)"]
    );

    // The recovery queue is left alone in dry runs.
    assert_eq!(h.queue().pending().await.len(), 1);
    enqueue.assert_async().await;
}

#[tokio::test]
async fn test_retention_applies_after_store() {
    let h = Harness::new().await;
    for stamp in ["2024-01-01_00-00-00", "2024-01-02_00-00-00"] {
        let name = format!("notion-export-markdown_{stamp}.zip");
        std::fs::write(h.storage_dir.path().join(name), b"old").unwrap();
        std::thread::sleep(Duration::from_millis(20));
    }

    let summary = h
        .coordinator("[application]\ndry_run = true\n\n[storage]\nmax_backups = 1\n")
        .run()
        .await;

    assert!(summary.is_successful());
    assert_eq!(h.stored_files(), vec![summary.artifact.unwrap().file_name]);
}

#[tokio::test]
async fn test_success_without_timestamp_is_invalid_and_not_queued() {
    let mut h = Harness::new().await;
    let _enqueue = h.mock_enqueue_ok().await;
    let _tasks = h
        .server
        .mock("POST", "/api/v3/getTasks")
        .with_status(200)
        .with_body(json!({ "results": [{ "id": "task-1", "state": "success" }] }).to_string())
        .create_async()
        .await;

    let summary = h.coordinator("").run().await;

    assert_eq!(summary.failed_phase, Some(ExportPhase::Polling));
    assert!(summary.error.unwrap().contains("Invalid response"));
    assert_eq!(summary.requeued, 0);
    assert!(h.queue().pending().await.is_empty());
}

#[tokio::test]
async fn test_rate_limited_feed_stops_matching_and_parks_task() {
    let mut h = Harness::new().await;
    let _enqueue = h.mock_enqueue_ok().await;
    let _tasks = h.mock_task_state("success").await;
    let feed = h
        .server
        .mock("POST", "/api/v3/getNotificationLogV2")
        .with_status(429)
        .expect(1)
        .create_async()
        .await;

    let summary = h.coordinator("").run().await;

    assert_eq!(summary.failed_phase, Some(ExportPhase::MatchingNotification));
    assert!(summary.error.unwrap().contains("Rate limit"));
    assert_eq!(h.queue().pending().await, vec![pending("task-1", 0)]);
    feed.assert_async().await;
}

#[tokio::test]
async fn test_failed_notification_update_does_not_fail_run() {
    let mut h = Harness::new().await;
    let _enqueue = h.mock_enqueue_ok().await;
    let _tasks = h.mock_task_state("success").await;
    let _feed = h.mock_feed("/exports/export.zip").await;
    let _download = h.mock_download("/exports/export.zip", 200).await;
    let update = h
        .server
        .mock("POST", "/api/v3/saveTransactionsMain")
        .with_status(500)
        .expect(1)
        .create_async()
        .await;

    let mut coordinator = h.coordinator("[export]\nnotification_action = \"mark_read\"\n");
    let summary = coordinator.run().await;

    assert!(summary.is_successful(), "error: {:?}", summary.error);
    assert_eq!(coordinator.phase(), ExportPhase::Done);
    assert_eq!(h.stored_files().len(), 1);
    assert_eq!(h.notifier.titles(), vec!["Backup Completed Successfully"]);
    update.assert_async().await;
}

#[tokio::test]
async fn test_enqueue_retries_server_errors_until_task_id() {
    let mut h = Harness::new().await;
    let failing = h
        .server
        .mock("POST", "/api/v3/enqueueTask")
        .with_status(502)
        .expect(2)
        .create_async()
        .await;
    let ok = h
        .server
        .mock("POST", "/api/v3/enqueueTask")
        .with_status(200)
        .with_body(json!({ "taskId": "t9" }).to_string())
        .expect(1)
        .create_async()
        .await;

    let task_id = h.client().enqueue_export().await.unwrap();

    assert_eq!(task_id.as_str(), "t9");
    failing.assert_async().await;
    ok.assert_async().await;
}

#[tokio::test]
async fn test_enqueue_gives_up_after_max_attempts() {
    let mut h = Harness::new().await;
    let failing = h
        .server
        .mock("POST", "/api/v3/enqueueTask")
        .with_status(500)
        .expect(3)
        .create_async()
        .await;

    let err = h.client().enqueue_export().await.unwrap_err();

    assert!(err.to_string().contains("enqueueTask returned HTTP 500"));
    assert!(!err.is_recovery_eligible());
    failing.assert_async().await;
}

#[tokio::test]
async fn test_poll_continues_through_rate_limits_errors_and_pending_states() {
    let mut h = Harness::new().await;
    let mut mocks = Vec::new();
    mocks.push(
        h.server
            .mock("POST", "/api/v3/getTasks")
            .with_status(429)
            .expect(1)
            .create_async()
            .await,
    );
    mocks.push(
        h.server
            .mock("POST", "/api/v3/getTasks")
            .with_status(500)
            .expect(1)
            .create_async()
            .await,
    );
    mocks.push(
        h.server
            .mock("POST", "/api/v3/getTasks")
            .with_status(200)
            .with_body(json!({ "results": [{ "id": "t9", "state": "in_progress" }] }).to_string())
            .expect(1)
            .create_async()
            .await,
    );
    mocks.push(
        h.server
            .mock("POST", "/api/v3/getTasks")
            .with_status(200)
            .with_body(
                json!({ "results": [{ "id": "t9", "state": "success", "equeuedAt": 42 }] })
                    .to_string(),
            )
            .expect(1)
            .create_async()
            .await,
    );

    let task = h
        .client()
        .wait_for_completion(&TaskId::new("t9").unwrap())
        .await
        .unwrap();

    assert_eq!(task.enqueued_at, 42);
    assert_eq!(task.task_id.as_str(), "t9");
    for mock in mocks {
        mock.assert_async().await;
    }
}

#[tokio::test]
async fn test_failed_notification_update_keeps_tracked_id() {
    let mut h = Harness::new().await;
    let _feed = h.mock_feed("/exports/export.zip").await;
    let rejected = h
        .server
        .mock("POST", "/api/v3/saveTransactionsMain")
        .with_status(500)
        .expect(1)
        .create_async()
        .await;
    let accepted = h
        .server
        .mock("POST", "/api/v3/saveTransactionsMain")
        .match_body(Matcher::Regex(r#""id":"n-1""#.to_string()))
        .with_status(200)
        .with_body("{}")
        .expect(1)
        .create_async()
        .await;

    let mut client = h.client();
    client.locate_export(&confirmed_task()).await.unwrap();
    assert_eq!(
        client.tracked_notification().map(|n| n.to_string()),
        Some("n-1".to_string())
    );

    assert!(client
        .update_notification(NotificationAction::Archive)
        .await
        .is_err());
    assert_eq!(
        client.tracked_notification().map(|n| n.to_string()),
        Some("n-1".to_string())
    );

    assert!(client
        .update_notification(NotificationAction::Archive)
        .await
        .unwrap());
    assert!(client.tracked_notification().is_none());

    rejected.assert_async().await;
    accepted.assert_async().await;
}

#[tokio::test]
async fn test_download_larger_than_write_block_is_intact() {
    let mut h = Harness::new().await;
    let body: Vec<u8> = (0..20_001u32).map(|i| (i % 251) as u8).collect();
    let _download = h
        .server
        .mock("GET", "/exports/large.zip")
        .with_status(200)
        .with_body(&body)
        .create_async()
        .await;
    let dest = TempDir::new().unwrap();

    let artifact = h
        .client()
        .download(
            &format!("{}/exports/large.zip", h.server.url()),
            dest.path(),
            "large.zip",
        )
        .await
        .unwrap();

    assert_eq!(artifact.size_bytes, body.len() as u64);
    assert_eq!(artifact.sha256, format!("{:x}", Sha256::digest(&body)));
    assert_eq!(std::fs::read(&artifact.path).unwrap(), body);
}
