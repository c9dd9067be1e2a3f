//! In-process list store
//!
//! Backs the recovery queue in tests and anywhere a throwaway queue is
//! enough. It can be switched offline to exercise degraded behavior.

use super::traits::ListStore;
use crate::domain::{BackupError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;

#[derive(Debug, Default)]
pub struct MemoryListStore {
    lists: Mutex<HashMap<String, Vec<String>>>,
    offline: AtomicBool,
}

impl MemoryListStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent operation fail as if the store were unreachable
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check_online(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(BackupError::Queue("memory store is offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ListStore for MemoryListStore {
    async fn ping(&self) -> Result<()> {
        self.check_online()
    }

    async fn push(&self, key: &str, value: String) -> Result<()> {
        self.check_online()?;
        self.lists
            .lock()
            .await
            .entry(key.to_string())
            .or_default()
            .push(value);
        Ok(())
    }

    async fn take_all(&self, key: &str) -> Result<Vec<String>> {
        self.check_online()?;
        Ok(self.lists.lock().await.remove(key).unwrap_or_default())
    }

    async fn read_all(&self, key: &str) -> Result<Vec<String>> {
        self.check_online()?;
        Ok(self.lists.lock().await.get(key).cloned().unwrap_or_default())
    }

    async fn replace(&self, key: &str, values: Vec<String>) -> Result<()> {
        self.check_online()?;
        let mut lists = self.lists.lock().await;
        if values.is_empty() {
            lists.remove(key);
        } else {
            lists.insert(key.to_string(), values);
        }
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
