//! Completion matcher
//!
//! The platform never says "export X is ready at URL Y". What it offers is a
//! feed of activities, some of which are export completions. This module
//! picks the completion that belongs to a given task by timestamp proximity:
//! the earliest completion at or after the task's enqueue time wins.

use crate::domain::{ActivityId, ActivityKind, ActivityRecord, FeedSnapshot, NotificationId};
use chrono::{TimeZone, Utc};

/// Completions later than this after enqueue are still accepted but flagged
pub const SLOW_COMPLETION_THRESHOLD_MS: i64 = 300_000;

/// The activity selected for a task, with everything later phases need
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionMatch {
    pub activity_id: ActivityId,
    /// Signed download link from the activity's first edit
    pub link: String,
    /// `start_time - enqueued_at`, never negative
    pub time_diff_ms: i64,
    pub slow_completion: bool,
    /// First notification pointing at the activity, if any
    pub notification_id: Option<NotificationId>,
}

fn readable(ms: i64) -> String {
    Utc.timestamp_millis_opt(ms)
        .single()
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|| ms.to_string())
}

/// Select the export completion for a task enqueued at `enqueued_at`
///
/// Only `export-completed` activities with a non-negative time difference
/// are candidates. The smallest difference wins and ties go to the activity
/// that appears first in the snapshot. When the winner has no link in its
/// first edit the result is `None`; the next candidate is not tried, since
/// it belongs to a different export.
pub fn match_completion(snapshot: &FeedSnapshot, enqueued_at: i64) -> Option<CompletionMatch> {
    let mut best: Option<(&ActivityRecord, i64)> = None;
    let mut candidates = 0usize;
    let mut earlier = Vec::new();

    for activity in snapshot
        .activities
        .iter()
        .filter(|a| a.kind == ActivityKind::ExportCompleted)
    {
        let time_diff = activity.start_time - enqueued_at;
        if time_diff < 0 {
            earlier.push((activity, time_diff));
            continue;
        }

        candidates += 1;
        tracing::debug!(
            activity_id = %activity.id,
            time = %readable(activity.start_time),
            time_diff_ms = time_diff,
            "Candidate export-completed activity"
        );
        // Strict comparison keeps the first of equal candidates.
        if best.map_or(true, |(_, d)| time_diff < d) {
            best = Some((activity, time_diff));
        }
    }

    let Some((activity, time_diff)) = best else {
        if !earlier.is_empty() {
            tracing::warn!(
                count = earlier.len(),
                enqueued_at = %readable(enqueued_at),
                "Found export-completed activities, but none after the enqueue time"
            );
            for (activity, diff) in &earlier {
                tracing::info!(
                    activity_id = %activity.id,
                    time = %readable(activity.start_time),
                    time_diff_ms = diff,
                    "Skipped earlier export-completed activity"
                );
            }
        }
        return None;
    };

    let slow_completion = time_diff > SLOW_COMPLETION_THRESHOLD_MS;
    tracing::info!(
        activity_id = %activity.id,
        time_diff_ms = time_diff,
        candidates,
        "Selected export-completed activity"
    );
    if slow_completion {
        tracing::warn!(
            activity_id = %activity.id,
            time_diff_ms = time_diff,
            "Matched completion is more than 5 minutes after enqueue time"
        );
    }

    let Some(link) = activity.first_link() else {
        tracing::warn!(
            activity_id = %activity.id,
            edits = activity.edits.len(),
            "Matched activity carries no download link"
        );
        return None;
    };

    Some(CompletionMatch {
        activity_id: activity.id.clone(),
        link: link.to_string(),
        time_diff_ms: time_diff,
        slow_completion,
        notification_id: snapshot.notification_for(&activity.id).map(|n| n.id.clone()),
    })
}
