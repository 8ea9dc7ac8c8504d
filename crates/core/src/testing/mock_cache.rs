//! Mock cache store for testing.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::cache::{CacheError, CacheStore};

/// A recorded `set` call for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedSet {
    pub key: String,
    pub value: Vec<u8>,
    pub ttl: Duration,
}

/// Mock implementation of the CacheStore trait.
///
/// Values never expire on their own; use [`MockCacheStore::expire`] to
/// simulate TTL expiry. Every `set` is recorded along with its TTL.
#[derive(Debug, Clone, Default)]
pub struct MockCacheStore {
    values: Arc<RwLock<HashMap<String, Vec<u8>>>>,
    sets: Arc<RwLock<Vec<RecordedSet>>>,
    gets: Arc<RwLock<usize>>,
    next_get_error: Arc<RwLock<Option<CacheError>>>,
    next_set_error: Arc<RwLock<Option<CacheError>>>,
}

impl MockCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a raw value without recording a `set`.
    pub async fn insert_raw(&self, key: &str, value: Vec<u8>) {
        self.values.write().await.insert(key.to_string(), value);
    }

    /// Drop a key, as if its TTL had elapsed.
    pub async fn expire(&self, key: &str) {
        self.values.write().await.remove(key);
    }

    /// The next `get` fails with `error`.
    pub async fn fail_next_get(&self, error: CacheError) {
        *self.next_get_error.write().await = Some(error);
    }

    /// The next `set` fails with `error`.
    pub async fn fail_next_set(&self, error: CacheError) {
        *self.next_set_error.write().await = Some(error);
    }

    /// All successful `set` calls, in order.
    pub async fn recorded_sets(&self) -> Vec<RecordedSet> {
        self.sets.read().await.clone()
    }

    pub async fn get_count(&self) -> usize {
        *self.gets.read().await
    }
}

#[async_trait]
impl CacheStore for MockCacheStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        *self.gets.write().await += 1;
        if let Some(error) = self.next_get_error.write().await.take() {
            return Err(error);
        }
        Ok(self.values.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        if let Some(error) = self.next_set_error.write().await.take() {
            return Err(error);
        }
        self.values
            .write()
            .await
            .insert(key.to_string(), value.clone());
        self.sets.write().await.push(RecordedSet {
            key: key.to_string(),
            value,
            ttl,
        });
        Ok(())
    }
}
