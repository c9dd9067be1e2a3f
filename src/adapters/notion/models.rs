//! Wire models for the platform's internal v3 API
//!
//! Request bodies are typed; responses are read leniently because the feed
//! mixes record shapes and the platform is free to add fields.

use crate::config::ExportConfig;
use crate::domain::{
    ActivityId, ActivityKind, ActivityRecord, FeedSnapshot, NotificationAction, NotificationId,
    NotificationRecord,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// `enqueueTask` request body
#[derive(Debug, Serialize)]
pub struct EnqueueTaskRequest<'a> {
    pub task: ExportSpaceTask<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportSpaceTask<'a> {
    pub event_name: &'static str,
    pub request: ExportSpaceRequest<'a>,
    pub cell_routing: CellRouting,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportSpaceRequest<'a> {
    pub space_id: &'a str,
    pub export_options: ExportOptions<'a>,
    pub recursive: bool,
    pub should_export_comments: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportOptions<'a> {
    pub export_type: &'static str,
    pub time_zone: &'a str,
    pub locale: &'a str,
    pub collection_view_export_type: &'static str,
    pub flatten_export_filetree: bool,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CellRouting {
    pub space_ids: Vec<String>,
}

impl<'a> EnqueueTaskRequest<'a> {
    /// Whole-workspace export request
    pub fn export_space(space_id: &'a str, export: &'a ExportConfig) -> Self {
        Self {
            task: ExportSpaceTask {
                event_name: "exportSpace",
                request: ExportSpaceRequest {
                    space_id,
                    export_options: ExportOptions {
                        export_type: export.export_type.as_str(),
                        time_zone: &export.time_zone,
                        locale: &export.locale,
                        collection_view_export_type: "currentView",
                        flatten_export_filetree: export.flatten_export_filetree,
                    },
                    recursive: export.recursive,
                    should_export_comments: export.export_comments,
                },
                cell_routing: CellRouting::default(),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnqueueTaskResponse {
    #[serde(default)]
    pub task_id: Option<String>,
}

/// `getTasks` request body
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetTasksRequest<'a> {
    pub task_ids: [&'a str; 1],
}

#[derive(Debug, Default, Deserialize)]
pub struct GetTasksResponse {
    #[serde(default)]
    pub results: Vec<TaskStatus>,
}

/// One task status record
#[derive(Debug, Default, Deserialize)]
pub struct TaskStatus {
    #[serde(default)]
    pub state: Option<String>,

    /// Completion timestamp. The platform spells this field `equeuedAt`
    /// and the name must be read exactly as sent.
    #[serde(default, rename = "equeuedAt")]
    pub equeued_at: Option<Value>,
}

impl TaskStatus {
    pub fn enqueued_at_ms(&self) -> Option<i64> {
        self.equeued_at.as_ref().and_then(lenient_i64)
    }
}

/// `getNotificationLogV2` request body
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationLogRequest<'a> {
    pub space_id: &'a str,
    pub size: u32,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub variant: &'static str,
}

impl<'a> NotificationLogRequest<'a> {
    pub fn read_and_unread(space_id: &'a str, size: u32) -> Self {
        Self {
            space_id,
            size,
            kind: "unread_and_read",
            variant: "no_grouping",
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationLogResponse {
    #[serde(default)]
    pub record_map: RecordMap,
    #[serde(default)]
    pub notification_ids: Vec<String>,
}

/// Record tables keyed by record id, in the order the platform sent them
#[derive(Debug, Default, Deserialize)]
pub struct RecordMap {
    #[serde(default)]
    pub activity: Map<String, Value>,
    #[serde(default)]
    pub notification: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct RecordEnvelope<T> {
    value: T,
}

#[derive(Debug, Deserialize)]
struct ActivityValue {
    id: String,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    start_time: Option<Value>,
    #[serde(default)]
    edits: Vec<EditValue>,
}

#[derive(Debug, Deserialize)]
struct EditValue {
    #[serde(default)]
    link: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NotificationValue {
    id: String,
    #[serde(default)]
    activity_id: Option<String>,
    #[serde(default)]
    read: bool,
    #[serde(default)]
    visited: bool,
    #[serde(default)]
    archived_at: Option<Value>,
}

impl NotificationLogResponse {
    /// Convert the raw record map into a feed snapshot
    ///
    /// Records that do not have the expected shape are skipped. Notifications
    /// follow `notificationIds` order when the platform sends it.
    pub fn into_snapshot(self) -> FeedSnapshot {
        let activities = self
            .record_map
            .activity
            .into_iter()
            .filter_map(|(key, raw)| {
                match serde_json::from_value::<RecordEnvelope<ActivityValue>>(raw) {
                    Ok(record) => Some(record.value),
                    Err(e) => {
                        tracing::debug!(record = %key, error = %e, "Skipping unreadable activity record");
                        None
                    }
                }
            })
            .map(|value| ActivityRecord {
                id: ActivityId::new(value.id),
                kind: ActivityKind::from(value.kind.as_deref().unwrap_or_default()),
                start_time: value.start_time.as_ref().and_then(lenient_i64).unwrap_or(0),
                edits: value.edits.into_iter().map(|e| e.link).collect(),
            })
            .collect();

        let mut by_id: Map<String, Value> = self.record_map.notification;
        let mut ordered: Vec<Value> = self
            .notification_ids
            .iter()
            .filter_map(|id| by_id.remove(id))
            .collect();
        ordered.extend(by_id.into_iter().map(|(_, v)| v));

        let notifications = ordered
            .into_iter()
            .filter_map(|raw| serde_json::from_value::<RecordEnvelope<NotificationValue>>(raw).ok())
            .filter_map(|record| {
                let value = record.value;
                let activity_id = value.activity_id?;
                Some(NotificationRecord {
                    id: NotificationId::new(value.id),
                    activity_id: ActivityId::new(activity_id),
                    read: value.read,
                    visited: value.visited,
                    archived_at: value.archived_at.as_ref().and_then(lenient_i64),
                })
            })
            .collect();

        FeedSnapshot {
            activities,
            notifications,
        }
    }
}

/// `saveTransactionsMain` request body
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveTransactionsRequest {
    pub request_id: String,
    pub transactions: Vec<Transaction>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    pub space_id: String,
    pub debug: TransactionDebug,
    pub operations: Vec<Operation>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionDebug {
    pub user_action: String,
}

#[derive(Debug, Serialize)]
pub struct Operation {
    pub command: &'static str,
    pub pointer: Pointer,
    pub path: Vec<String>,
    pub args: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pointer {
    pub table: &'static str,
    pub id: String,
    pub space_id: String,
}

impl SaveTransactionsRequest {
    /// Single update of one notification record
    ///
    /// Returns `None` for [`NotificationAction::None`].
    pub fn notification_update(
        space_id: &str,
        notification_id: &NotificationId,
        action: NotificationAction,
        now_ms: i64,
    ) -> Option<Self> {
        let args = match action {
            NotificationAction::None => return None,
            NotificationAction::MarkRead => serde_json::json!({ "read": true, "visited": true }),
            NotificationAction::MarkUnread => serde_json::json!({ "read": false }),
            NotificationAction::Archive => serde_json::json!({ "archived_at": now_ms }),
            NotificationAction::Unarchive => serde_json::json!({ "archived_at": null }),
        };

        Some(Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            transactions: vec![Transaction {
                id: uuid::Uuid::new_v4().to_string(),
                space_id: space_id.to_string(),
                debug: TransactionDebug {
                    user_action: format!("notificationActions.{}", action.as_str()),
                },
                operations: vec![Operation {
                    command: "update",
                    pointer: Pointer {
                        table: "notification",
                        id: notification_id.to_string(),
                        space_id: space_id.to_string(),
                    },
                    path: Vec::new(),
                    args,
                }],
            }],
        })
    }
}

/// Millisecond timestamps arrive as integers, floats or numeric strings
fn lenient_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_enqueue_request_shape() {
        let export = ExportConfig::default();
        let body = serde_json::to_value(EnqueueTaskRequest::export_space("space-1", &export)).unwrap();
        assert_eq!(
            body,
            json!({
                "task": {
                    "eventName": "exportSpace",
                    "request": {
                        "spaceId": "space-1",
                        "exportOptions": {
                            "exportType": "markdown",
                            "timeZone": "UTC",
                            "locale": "en",
                            "collectionViewExportType": "currentView",
                            "flattenExportFiletree": false
                        },
                        "recursive": true,
                        "shouldExportComments": true
                    },
                    "cellRouting": { "spaceIds": [] }
                }
            })
        );
    }

    #[test]
    fn test_task_status_reads_platform_field_name() {
        let response: GetTasksResponse = serde_json::from_value(json!({
            "results": [{ "state": "success", "equeuedAt": 1700000000123i64 }]
        }))
        .unwrap();
        assert_eq!(response.results[0].enqueued_at_ms(), Some(1_700_000_000_123));

        let corrected: GetTasksResponse = serde_json::from_value(json!({
            "results": [{ "state": "success", "enqueuedAt": 1 }]
        }))
        .unwrap();
        assert_eq!(corrected.results[0].enqueued_at_ms(), None);
    }

    #[test]
    fn test_notification_request_shape() {
        let body =
            serde_json::to_value(NotificationLogRequest::read_and_unread("space-1", 20)).unwrap();
        assert_eq!(
            body,
            json!({"spaceId": "space-1", "size": 20, "type": "unread_and_read", "variant": "no_grouping"})
        );
    }

    #[test]
    fn test_into_snapshot_keeps_order_and_skips_garbage() {
        let response: NotificationLogResponse = serde_json::from_value(json!({
            "recordMap": {
                "activity": {
                    "b": { "value": { "id": "b", "type": "export-completed", "start_time": "200",
                                      "edits": [{ "link": "https://dl/b.zip", "type": "export" }] } },
                    "broken": { "role": "reader" },
                    "a": { "value": { "id": "a", "type": "commented", "start_time": 100 } }
                },
                "notification": {
                    "n2": { "value": { "id": "n2", "activity_id": "a" } },
                    "n1": { "value": { "id": "n1", "activity_id": "b", "read": true } }
                }
            },
            "notificationIds": ["n1", "n2"]
        }))
        .unwrap();

        let snapshot = response.into_snapshot();
        let ids: Vec<&str> = snapshot.activities.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert_eq!(snapshot.activities[0].start_time, 200);
        assert_eq!(snapshot.activities[0].first_link(), Some("https://dl/b.zip"));
        assert_eq!(snapshot.activities[1].kind, ActivityKind::Other("commented".into()));

        let notes: Vec<&str> = snapshot.notifications.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(notes, vec!["n1", "n2"]);
        assert!(snapshot.notifications[0].read);
    }

    #[test]
    fn test_notification_update_args() {
        let id = NotificationId::new("n-1");
        let archive =
            SaveTransactionsRequest::notification_update("s", &id, NotificationAction::Archive, 42)
                .unwrap();
        let body = serde_json::to_value(&archive).unwrap();
        let op = &body["transactions"][0]["operations"][0];
        assert_eq!(op["command"], "update");
        assert_eq!(op["pointer"], json!({"table": "notification", "id": "n-1", "spaceId": "s"}));
        assert_eq!(op["path"], json!([]));
        assert_eq!(op["args"], json!({"archived_at": 42}));

        let unarchive =
            SaveTransactionsRequest::notification_update("s", &id, NotificationAction::Unarchive, 0)
                .unwrap();
        let body = serde_json::to_value(&unarchive).unwrap();
        assert_eq!(
            body["transactions"][0]["operations"][0]["args"],
            json!({"archived_at": null})
        );

        assert!(
            SaveTransactionsRequest::notification_update("s", &id, NotificationAction::None, 0)
                .is_none()
        );
    }
}
