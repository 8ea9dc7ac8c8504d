//! Mock archive store for testing.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::archive::{ArchiveError, ArchiveStore};
use crate::ticket::Ticket;

/// Mock implementation of the ArchiveStore trait.
///
/// Keeps records in a map keyed by `(email, id)` and can be told to fail
/// every write.
#[derive(Debug, Clone, Default)]
pub struct MockArchiveStore {
    records: Arc<RwLock<BTreeMap<(String, String), Ticket>>>,
    put_error: Arc<RwLock<Option<ArchiveError>>>,
    puts: Arc<RwLock<usize>>,
}

impl MockArchiveStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `put` fails with `error` until cleared.
    pub async fn fail_puts(&self, error: ArchiveError) {
        *self.put_error.write().await = Some(error);
    }

    pub async fn clear_failures(&self) {
        *self.put_error.write().await = None;
    }

    /// Number of successful writes.
    pub async fn put_count(&self) -> usize {
        *self.puts.read().await
    }

    /// Number of stored records.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl ArchiveStore for MockArchiveStore {
    async fn put(&self, email: &str, id: &str, ticket: &Ticket) -> Result<(), ArchiveError> {
        if let Some(error) = self.put_error.read().await.clone() {
            return Err(error);
        }
        self.records
            .write()
            .await
            .insert((email.to_string(), id.to_string()), ticket.clone());
        *self.puts.write().await += 1;
        Ok(())
    }

    async fn get(&self, email: &str, id: &str) -> Result<Option<Ticket>, ArchiveError> {
        Ok(self
            .records
            .read()
            .await
            .get(&(email.to_string(), id.to_string()))
            .cloned())
    }

    async fn list_for_user(&self, email: &str) -> Result<Vec<Ticket>, ArchiveError> {
        Ok(self
            .records
            .read()
            .await
            .iter()
            .filter(|((e, _), _)| e == email)
            .map(|(_, t)| t.clone())
            .collect())
    }
}
