//! List store abstraction
//!
//! The recovery queue only needs a handful of list primitives from its
//! backing store. Keeping them behind a trait lets the queue semantics run
//! against Redis in production and an in-process store in tests.

use crate::domain::Result;
use async_trait::async_trait;

/// Durable list keyed by name
///
/// Values are opaque strings; the caller owns their encoding. All methods
/// return `BackupError::Queue` when the store cannot be reached.
#[async_trait]
pub trait ListStore: Send + Sync {
    /// Check that the store answers
    async fn ping(&self) -> Result<()>;

    /// Append one value to the tail of the list
    async fn push(&self, key: &str, value: String) -> Result<()>;

    /// Read every value and delete the key in one indivisible step
    ///
    /// Two callers racing on the same key never both receive an entry.
    async fn take_all(&self, key: &str) -> Result<Vec<String>>;

    /// Read every value without removing anything
    async fn read_all(&self, key: &str) -> Result<Vec<String>>;

    /// Replace the list contents with `values`
    ///
    /// An empty `values` leaves the key deleted.
    async fn replace(&self, key: &str, values: Vec<String>) -> Result<()>;

    /// Human-readable location of the store, safe to log
    fn describe(&self) -> String;
}
