//! Export data model
//!
//! Types describing one export: the platform task, the activity and
//! notification records read from the feed, and the recovery entry that is
//! parked when a confirmed export could not be finished.

use super::ids::{ActivityId, NotificationId, TaskId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Activity type emitted by the platform when an export archive is ready
pub const EXPORT_COMPLETED: &str = "export-completed";

/// Number of failed recovery attempts after which an entry is dropped
pub const MAX_RECOVERY_ATTEMPTS: u32 = 3;

/// Archive flavour requested from the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExportType {
    /// Markdown and CSV
    #[default]
    Markdown,
    /// HTML
    Html,
}

impl ExportType {
    /// Wire and filename representation
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportType::Markdown => "markdown",
            ExportType::Html => "html",
        }
    }
}

impl fmt::Display for ExportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ExportType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "markdown" => Ok(ExportType::Markdown),
            "html" => Ok(ExportType::Html),
            other => Err(format!(
                "Invalid export_type '{other}'. Must be one of: markdown, html"
            )),
        }
    }
}

/// State change applied to the matched notification after a successful run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NotificationAction {
    /// Leave the notification untouched
    #[default]
    None,
    MarkRead,
    MarkUnread,
    Archive,
    Unarchive,
}

impl NotificationAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationAction::None => "none",
            NotificationAction::MarkRead => "mark_read",
            NotificationAction::MarkUnread => "mark_unread",
            NotificationAction::Archive => "archive",
            NotificationAction::Unarchive => "unarchive",
        }
    }
}

impl std::str::FromStr for NotificationAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(NotificationAction::None),
            "mark_read" => Ok(NotificationAction::MarkRead),
            "mark_unread" => Ok(NotificationAction::MarkUnread),
            "archive" => Ok(NotificationAction::Archive),
            "unarchive" => Ok(NotificationAction::Unarchive),
            other => Err(format!(
                "Invalid notification_action '{other}'. Must be one of: none, mark_read, mark_unread, archive, unarchive"
            )),
        }
    }
}

/// An export task whose completion has been confirmed by the poller
///
/// `enqueued_at` comes from the terminal task record, not from the enqueue
/// response, so this type only exists once polling has succeeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportTask {
    pub task_id: TaskId,
    /// Milliseconds since the Unix epoch
    pub enqueued_at: i64,
}

/// Kind of an activity feed entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivityKind {
    ExportCompleted,
    Other(String),
}

impl From<&str> for ActivityKind {
    fn from(value: &str) -> Self {
        if value == EXPORT_COMPLETED {
            ActivityKind::ExportCompleted
        } else {
            ActivityKind::Other(value.to_string())
        }
    }
}

/// One activity from the feed snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityRecord {
    pub id: ActivityId,
    pub kind: ActivityKind,
    /// Milliseconds since the Unix epoch
    pub start_time: i64,
    /// Edit entries in feed order; a missing link is kept as `None`
    pub edits: Vec<Option<String>>,
}

impl ActivityRecord {
    /// First edit's link, if the first edit carries one
    pub fn first_link(&self) -> Option<&str> {
        self.edits.first().and_then(|e| e.as_deref())
    }
}

/// One notification from the feed snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationRecord {
    pub id: NotificationId,
    pub activity_id: ActivityId,
    pub read: bool,
    pub visited: bool,
    pub archived_at: Option<i64>,
}

/// A bounded snapshot of the notification feed, in the order the platform
/// returned it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedSnapshot {
    pub activities: Vec<ActivityRecord>,
    pub notifications: Vec<NotificationRecord>,
}

impl FeedSnapshot {
    /// First notification pointing at the given activity
    pub fn notification_for(&self, activity_id: &ActivityId) -> Option<&NotificationRecord> {
        self.notifications
            .iter()
            .find(|n| &n.activity_id == activity_id)
    }
}

/// Recovery queue entry for an export that completed server-side but was not
/// fully retrieved or stored
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingRecovery {
    pub task_id: TaskId,
    pub enqueued_at: i64,
    #[serde(default)]
    pub retry_count: u32,
}

impl PendingRecovery {
    /// Fresh entry for a task whose completion has been confirmed
    pub fn new(task: &ExportTask) -> Self {
        Self {
            task_id: task.task_id.clone(),
            enqueued_at: task.enqueued_at,
            retry_count: 0,
        }
    }

    /// Whether the entry has used up its recovery attempts
    pub fn is_exhausted(&self) -> bool {
        self.retry_count >= MAX_RECOVERY_ATTEMPTS
    }

    /// Entry to re-push after a failed recovery attempt
    pub fn next_attempt(&self) -> Self {
        Self {
            retry_count: self.retry_count + 1,
            ..self.clone()
        }
    }

    pub fn as_task(&self) -> ExportTask {
        ExportTask {
            task_id: self.task_id.clone(),
            enqueued_at: self.enqueued_at,
        }
    }
}

/// Phases of one orchestrated run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportPhase {
    Idle,
    RecoveryDrain,
    Triggering,
    Polling,
    MatchingNotification,
    Downloading,
    Storing,
    Notifying,
    Done,
    Failed,
}

impl ExportPhase {
    /// Failures in these phases happen after the platform confirmed the
    /// export, so the task can be resumed without re-triggering it.
    pub fn is_post_confirmation(&self) -> bool {
        matches!(
            self,
            ExportPhase::MatchingNotification | ExportPhase::Downloading | ExportPhase::Storing
        )
    }
}

impl fmt::Display for ExportPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExportPhase::Idle => "idle",
            ExportPhase::RecoveryDrain => "recovery_drain",
            ExportPhase::Triggering => "triggering",
            ExportPhase::Polling => "polling",
            ExportPhase::MatchingNotification => "matching_notification",
            ExportPhase::Downloading => "downloading",
            ExportPhase::Storing => "storing",
            ExportPhase::Notifying => "notifying",
            ExportPhase::Done => "done",
            ExportPhase::Failed => "failed",
        };
        f.write_str(name)
    }
}
