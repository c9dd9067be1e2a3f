//! Recovery queue
//!
//! Exports that finished on the platform but were never downloaded or stored
//! are parked here as JSON-encoded [`PendingRecovery`] entries and replayed
//! at the start of the next run.
//!
//! The queue is optional. Without a backing store, or when the store stops
//! answering, every operation logs a warning and does nothing; callers never
//! see a queue error.

use crate::adapters::queue::ListStore;
use crate::domain::{PendingRecovery, TaskId};
use std::sync::Arc;

pub struct RecoveryQueue {
    store: Option<Arc<dyn ListStore>>,
    key: String,
}

impl RecoveryQueue {
    pub fn new(store: Option<Arc<dyn ListStore>>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    /// Queue with no backing store
    pub fn disabled() -> Self {
        Self::new(None, String::new())
    }

    pub fn is_available(&self) -> bool {
        self.store.is_some()
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Append an entry
    ///
    /// Returns `true` when the entry reached the store.
    pub async fn push(&self, entry: &PendingRecovery) -> bool {
        let Some(store) = self.store.as_ref() else {
            tracing::warn!(task_id = %entry.task_id, "Recovery queue unavailable, cannot park export");
            return false;
        };

        let payload = match serde_json::to_string(entry) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!(task_id = %entry.task_id, error = %e, "Failed to encode recovery entry");
                return false;
            }
        };

        match store.push(&self.key, payload).await {
            Ok(()) => {
                tracing::info!(
                    task_id = %entry.task_id,
                    retry_count = entry.retry_count,
                    "Pushed pending export to recovery queue"
                );
                true
            }
            Err(e) => {
                tracing::warn!(task_id = %entry.task_id, error = %e, "Failed to push pending export");
                false
            }
        }
    }

    /// Remove and return every pending entry in one atomic step
    ///
    /// Entries that cannot be decoded are dropped with a warning; they were
    /// removed from the store by the same atomic read.
    pub async fn drain_all(&self) -> Vec<PendingRecovery> {
        let Some(store) = self.store.as_ref() else {
            tracing::warn!("Recovery queue unavailable, skipping recovery");
            return Vec::new();
        };

        let raw = match store.take_all(&self.key).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to drain recovery queue");
                return Vec::new();
            }
        };

        let entries: Vec<PendingRecovery> = raw
            .iter()
            .filter_map(|item| match serde_json::from_str(item) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::warn!(error = %e, length = item.len(), "Dropping malformed recovery entry");
                    None
                }
            })
            .collect();

        if !entries.is_empty() {
            tracing::info!(count = entries.len(), "Retrieved pending exports from recovery queue");
        }
        entries
    }

    /// Remove every entry for `task_id`, keeping malformed entries in place
    ///
    /// Returns `true` when the filtered list was written back.
    pub async fn remove(&self, task_id: &TaskId) -> bool {
        let Some(store) = self.store.as_ref() else {
            return false;
        };

        let items = match store.read_all(&self.key).await {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read recovery queue");
                return false;
            }
        };

        let before = items.len();
        let kept: Vec<String> = items
            .into_iter()
            .filter(|item| match serde_json::from_str::<PendingRecovery>(item) {
                Ok(entry) => &entry.task_id != task_id,
                Err(_) => true,
            })
            .collect();
        let removed = before - kept.len();

        match store.replace(&self.key, kept).await {
            Ok(()) => {
                tracing::info!(task_id = %task_id, removed, "Removed pending export from recovery queue");
                true
            }
            Err(e) => {
                tracing::warn!(task_id = %task_id, error = %e, "Failed to rewrite recovery queue");
                false
            }
        }
    }

    /// Current entries, without removing them
    pub async fn pending(&self) -> Vec<PendingRecovery> {
        let Some(store) = self.store.as_ref() else {
            return Vec::new();
        };

        match store.read_all(&self.key).await {
            Ok(items) => items
                .iter()
                .filter_map(|item| serde_json::from_str(item).ok())
                .collect(),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read recovery queue");
                Vec::new()
            }
        }
    }

    /// Check the backing store, `None` when the queue is disabled
    pub async fn test_connection(&self) -> Option<crate::domain::Result<()>> {
        match self.store.as_ref() {
            Some(store) => Some(store.ping().await),
            None => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::queue::MemoryListStore;

    const KEY: &str = "notion_backup_recovery_queue";

    fn entry(task: &str, retry_count: u32) -> PendingRecovery {
        PendingRecovery {
            task_id: TaskId::new(task).unwrap(),
            enqueued_at: 1_700_000_000_000,
            retry_count,
        }
    }

    fn queue_with_store() -> (RecoveryQueue, Arc<MemoryListStore>) {
        let store = Arc::new(MemoryListStore::new());
        let queue = RecoveryQueue::new(Some(store.clone() as Arc<dyn ListStore>), KEY);
        (queue, store)
    }

    #[tokio::test]
    async fn test_push_then_drain_round_trips_fields() {
        let (queue, _) = queue_with_store();
        assert!(queue.push(&entry("t-1", 0)).await);
        assert!(queue.push(&entry("t-2", 2)).await);

        let drained = queue.drain_all().await;
        assert_eq!(drained, vec![entry("t-1", 0), entry("t-2", 2)]);
    }

    #[tokio::test]
    async fn test_second_drain_sees_nothing() {
        let (queue, _) = queue_with_store();
        queue.push(&entry("t-1", 0)).await;

        assert_eq!(queue.drain_all().await.len(), 1);
        assert!(queue.drain_all().await.is_empty());
    }

    #[tokio::test]
    async fn test_drain_skips_malformed_entries() {
        let (queue, store) = queue_with_store();
        store.push(KEY, "not json".into()).await.unwrap();
        queue.push(&entry("t-1", 1)).await;

        assert_eq!(queue.drain_all().await, vec![entry("t-1", 1)]);
        assert!(store.read_all(KEY).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_remove_keeps_malformed_and_other_entries() {
        let (queue, store) = queue_with_store();
        queue.push(&entry("t-1", 0)).await;
        store.push(KEY, "{broken".into()).await.unwrap();
        queue.push(&entry("t-2", 0)).await;
        queue.push(&entry("t-1", 1)).await;

        assert!(queue.remove(&TaskId::new("t-1").unwrap()).await);

        let left = store.read_all(KEY).await.unwrap();
        assert_eq!(left.len(), 2);
        assert_eq!(left[0], "{broken");
        assert_eq!(queue.pending().await, vec![entry("t-2", 0)]);
    }

    #[tokio::test]
    async fn test_pending_does_not_remove() {
        let (queue, _) = queue_with_store();
        queue.push(&entry("t-1", 0)).await;

        assert_eq!(queue.pending().await.len(), 1);
        assert_eq!(queue.pending().await.len(), 1);
    }

    #[tokio::test]
    async fn test_disabled_queue_is_a_no_op() {
        let queue = RecoveryQueue::disabled();
        assert!(!queue.is_available());
        assert!(!queue.push(&entry("t-1", 0)).await);
        assert!(queue.drain_all().await.is_empty());
        assert!(!queue.remove(&TaskId::new("t-1").unwrap()).await);
        assert!(queue.test_connection().await.is_none());
    }

    #[tokio::test]
    async fn test_offline_store_degrades_without_error() {
        let (queue, store) = queue_with_store();
        queue.push(&entry("t-1", 0)).await;
        store.set_offline(true);

        assert!(!queue.push(&entry("t-2", 0)).await);
        assert!(queue.drain_all().await.is_empty());
        assert!(matches!(queue.test_connection().await, Some(Err(_))));

        store.set_offline(false);
        assert_eq!(queue.drain_all().await, vec![entry("t-1", 0)]);
    }
}
