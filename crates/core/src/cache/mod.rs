//! Open-ticket cache.
//!
//! The whole set of open tickets lives under a single key as one JSON array
//! (the "snapshot"). Every write replaces the value and resets its TTL.

mod memory;
mod snapshot;
mod sqlite;

pub use memory::MemoryCacheStore;
pub use snapshot::{load_snapshot, save_snapshot};
pub use sqlite::SqliteCacheStore;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::{CacheBackend, CacheConfig};

/// Cache key holding the open-ticket snapshot.
pub const SNAPSHOT_KEY: &str = "tickets:all";

/// Default sliding expiration for the snapshot (7 days).
pub const DEFAULT_SNAPSHOT_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

#[derive(Debug, Clone, Error)]
pub enum CacheError {
    #[error("Cache database error: {0}")]
    Database(String),

    #[error("Failed to encode cache value: {0}")]
    Encode(String),

    #[error("Cache unavailable: {0}")]
    Unavailable(String),
}

/// Key/value store with per-key expiration.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Read a value. Expired or absent keys are a miss (`None`).
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    /// Replace a value and set its expiration.
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError>;
}

/// Build the configured cache backend.
pub fn create_cache_store(
    config: &CacheConfig,
    database_path: &Path,
) -> Result<Arc<dyn CacheStore>, CacheError> {
    match config.backend {
        CacheBackend::Memory => Ok(Arc::new(MemoryCacheStore::new())),
        CacheBackend::Sqlite => Ok(Arc::new(SqliteCacheStore::new(database_path)?)),
    }
}
