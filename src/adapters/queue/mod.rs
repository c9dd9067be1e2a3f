//! Recovery queue backing stores
//!
//! - [`RedisListStore`] - Redis lists, used in production
//! - [`MemoryListStore`] - in-process lists for tests
//!
//! [`connect_list_store`] turns the `[recovery]` configuration into a store,
//! or `None` when the feature is off or the store cannot be reached.

pub mod memory;
pub mod redis;
pub mod traits;

pub use memory::MemoryListStore;
pub use redis::RedisListStore;
pub use traits::ListStore;

use crate::config::RecoveryConfig;
use std::sync::Arc;

/// Connect to the configured recovery store
///
/// Never fails: an absent host or an unreachable store yields `None` with a
/// logged warning, and the caller continues without recovery.
pub async fn connect_list_store(config: &RecoveryConfig) -> Option<Arc<dyn ListStore>> {
    if !config.is_enabled() {
        tracing::info!("Recovery queue disabled (no recovery host configured)");
        return None;
    }

    match RedisListStore::connect(config).await {
        Ok(store) => Some(Arc::new(store) as Arc<dyn ListStore>),
        Err(e) => {
            tracing::warn!(
                store = %config.display_url(),
                error = %e,
                "Recovery store unreachable, continuing without recovery"
            );
            None
        }
    }
}
