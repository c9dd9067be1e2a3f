//! Redis list store
//!
//! Maps the [`ListStore`] primitives onto Redis list commands:
//!
//! | Operation | Redis |
//! |-----------|-------|
//! | `push` | `RPUSH` |
//! | `take_all` | `MULTI LRANGE 0 -1, DEL EXEC` |
//! | `read_all` | `LRANGE 0 -1` |
//! | `replace` | `MULTI DEL, RPUSH EXEC` |
//!
//! `tls = true` connects with `rediss://` through rustls, using either the
//! system trust store or the configured `ca_cert_path` bundle.
//!
//! Before each operation the cached connection is checked with `PING`. A
//! failed check triggers one reconnect; if that fails too the operation
//! reports `BackupError::Queue`.

use super::traits::ListStore;
use crate::config::RecoveryConfig;
use crate::domain::{BackupError, Result};
use crate::logging::mask::mask_path;
use ::redis::aio::MultiplexedConnection;
use ::redis::AsyncCommands;
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::Mutex;

pub struct RedisListStore {
    client: ::redis::Client,
    conn: Mutex<Option<MultiplexedConnection>>,
    connect_timeout: Duration,
    display_url: String,
}

fn queue_error(context: &str, err: ::redis::RedisError) -> BackupError {
    BackupError::Queue(format!("{context}: {err}"))
}

impl RedisListStore {
    /// Connect to the store described by `config`
    ///
    /// # Errors
    ///
    /// Returns `BackupError::Queue` if no host is configured, the URL is
    /// invalid, or the first connection and `PING` do not succeed within
    /// `connect_timeout_seconds`.
    pub async fn connect(config: &RecoveryConfig) -> Result<Self> {
        let url = config
            .connection_url()
            .ok_or_else(|| BackupError::Queue("recovery store host is not configured".to_string()))?;
        let client = match config.ca_cert_path.as_deref().filter(|_| config.tls) {
            Some(ca_path) => {
                let root_cert = tokio::fs::read(ca_path).await.map_err(|e| {
                    BackupError::Queue(format!(
                        "failed to read CA bundle {}: {}",
                        mask_path(ca_path),
                        e
                    ))
                })?;
                ::redis::Client::build_with_tls(
                    url.as_str(),
                    ::redis::TlsCertificates {
                        client_tls: None,
                        root_cert: Some(root_cert),
                    },
                )
            }
            None => ::redis::Client::open(url.as_str()),
        }
        .map_err(|e| queue_error("failed to create Redis client", e))?;

        let store = Self {
            client,
            conn: Mutex::new(None),
            connect_timeout: Duration::from_secs(config.connect_timeout_seconds),
            display_url: config.display_url(),
        };

        let conn = store.open_connection().await?;
        *store.conn.lock().await = Some(conn);

        tracing::info!(store = %store.display_url, "Connected to recovery store");
        Ok(store)
    }

    async fn open_connection(&self) -> Result<MultiplexedConnection> {
        let mut conn = tokio::time::timeout(
            self.connect_timeout,
            self.client.get_multiplexed_async_connection(),
        )
        .await
        .map_err(|_| {
            BackupError::Queue(format!(
                "connection to {} timed out after {}s",
                self.display_url,
                self.connect_timeout.as_secs()
            ))
        })?
        .map_err(|e| queue_error("failed to connect to Redis", e))?;

        ::redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .map_err(|e| queue_error("PING failed", e))?;

        Ok(conn)
    }

    /// Cached connection, verified with `PING` and re-established once if lost
    async fn connection(&self) -> Result<MultiplexedConnection> {
        let mut guard = self.conn.lock().await;

        if let Some(conn) = guard.as_mut() {
            match ::redis::cmd("PING").query_async::<String>(conn).await {
                Ok(_) => return Ok(conn.clone()),
                Err(e) => tracing::warn!(
                    store = %self.display_url,
                    error = %e,
                    "Recovery store connection lost, attempting to reconnect"
                ),
            }
        }

        match self.open_connection().await {
            Ok(conn) => {
                *guard = Some(conn.clone());
                Ok(conn)
            }
            Err(e) => {
                *guard = None;
                Err(e)
            }
        }
    }
}

#[async_trait]
impl ListStore for RedisListStore {
    async fn ping(&self) -> Result<()> {
        self.connection().await.map(|_| ())
    }

    async fn push(&self, key: &str, value: String) -> Result<()> {
        let mut conn = self.connection().await?;
        let _: i64 = conn
            .rpush(key, value)
            .await
            .map_err(|e| queue_error("RPUSH failed", e))?;
        Ok(())
    }

    async fn take_all(&self, key: &str) -> Result<Vec<String>> {
        let mut conn = self.connection().await?;
        let (values,): (Vec<String>,) = ::redis::pipe()
            .atomic()
            .lrange(key, 0, -1)
            .del(key)
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(|e| queue_error("atomic drain failed", e))?;
        Ok(values)
    }

    async fn read_all(&self, key: &str) -> Result<Vec<String>> {
        let mut conn = self.connection().await?;
        conn.lrange(key, 0, -1)
            .await
            .map_err(|e| queue_error("LRANGE failed", e))
    }

    async fn replace(&self, key: &str, values: Vec<String>) -> Result<()> {
        let mut conn = self.connection().await?;
        let mut pipe = ::redis::pipe();
        pipe.atomic().del(key).ignore();
        if !values.is_empty() {
            pipe.rpush(key, values).ignore();
        }
        pipe.query_async::<()>(&mut conn)
            .await
            .map_err(|e| queue_error("list replace failed", e))
    }

    fn describe(&self) -> String {
        self.display_url.clone()
    }
}
