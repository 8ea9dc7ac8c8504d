//! Durable per-user store for closed tickets.
//!
//! Records are partitioned by submitter email and keyed by ticket id. The
//! store is write-once-or-overwrite; nothing is ever deleted.

mod sqlite;

pub use sqlite::SqliteArchiveStore;

use async_trait::async_trait;
use thiserror::Error;

use crate::ticket::Ticket;

#[derive(Debug, Clone, Error)]
pub enum ArchiveError {
    #[error("Archive database error: {0}")]
    Database(String),

    #[error("Failed to encode archived ticket: {0}")]
    Encode(String),

    #[error("Archive unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait ArchiveStore: Send + Sync {
    /// Insert or overwrite the record for `(email, id)`.
    async fn put(&self, email: &str, id: &str, ticket: &Ticket) -> Result<(), ArchiveError>;

    /// Read one archived record.
    async fn get(&self, email: &str, id: &str) -> Result<Option<Ticket>, ArchiveError>;

    /// All records in a user's partition, oldest archive first.
    async fn list_for_user(&self, email: &str) -> Result<Vec<Ticket>, ArchiveError>;
}
