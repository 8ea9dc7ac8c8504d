//! Closing tickets: cache removal followed by a durable archive write.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};

use crate::archive::ArchiveStore;
use crate::cache::{load_snapshot, save_snapshot, CacheStore};
use crate::metrics;
use crate::ticket::TicketStatus;

use super::types::{CloseOutcome, PipelineError};

/// Moves tickets from the open-ticket cache to the per-user archive.
#[derive(Clone)]
pub struct Archiver {
    cache: Arc<dyn CacheStore>,
    archive: Arc<dyn ArchiveStore>,
    ttl: Duration,
}

impl Archiver {
    pub fn new(cache: Arc<dyn CacheStore>, archive: Arc<dyn ArchiveStore>, ttl: Duration) -> Self {
        Self {
            cache,
            archive,
            ttl,
        }
    }

    /// Close an open ticket.
    ///
    /// An unknown id returns [`CloseOutcome::NotFound`] without writing
    /// anything. Otherwise the reduced snapshot is written first and the
    /// archive second. If the archive write fails the ticket stays out of the
    /// cache; its full JSON is logged so it can be restored by hand.
    pub async fn close(&self, ticket_id: &str) -> Result<CloseOutcome, PipelineError> {
        let mut snapshot = load_snapshot(self.cache.as_ref()).await?;

        let Some(position) = snapshot.iter().position(|t| t.id == ticket_id) else {
            metrics::ARCHIVES.with_label_values(&["not_found"]).inc();
            info!(ticket_id, "Close requested for unknown ticket");
            return Ok(CloseOutcome::NotFound);
        };

        let ticket = snapshot.remove(position);
        save_snapshot(self.cache.as_ref(), &snapshot, self.ttl).await?;

        let closed = ticket.with_status(TicketStatus::Closed);
        if let Err(e) = self
            .archive
            .put(&closed.submitted_by_email, &closed.id, &closed)
            .await
        {
            metrics::ARCHIVES.with_label_values(&["failed"]).inc();
            let record = serde_json::to_string(&closed).unwrap_or_default();
            error!(
                ticket_id = %closed.id,
                email = %closed.submitted_by_email,
                ticket = %record,
                error = %e,
                "Ticket removed from cache but archive write failed"
            );
            return Err(e.into());
        }

        metrics::ARCHIVES.with_label_values(&["archived"]).inc();
        info!(
            ticket_id = %closed.id,
            email = %closed.submitted_by_email,
            "Ticket closed and archived"
        );
        Ok(CloseOutcome::Closed(closed))
    }
}
