//! The ticket pipeline: submit, view, refresh and close.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::archive::ArchiveStore;
use crate::broker::{MessageSource, TicketPublisher};
use crate::cache::{load_snapshot, CacheStore};
use crate::config::Config;
use crate::notifier::Notifier;
use crate::ticket::{Ticket, TicketPriority};

use super::archiver::Archiver;
use super::config::DrainConfig;
use super::drainer::QueueDrainer;
use super::reconciler::Reconciler;
use super::types::{
    CloseOutcome, DrainBatch, PipelineError, RefreshReport, SubmitError, SubmitOutcome,
};

/// Tunables for [`TicketPipeline`].
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub drain: DrainConfig,
    pub cache_ttl: Duration,
    pub capitalize_priority: bool,
}

impl PipelineSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            drain: config.drain.clone(),
            cache_ttl: Duration::from_secs(config.cache.ttl_secs),
            capitalize_priority: config.broker.capitalize_priority,
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            drain: DrainConfig::default(),
            cache_ttl: crate::cache::DEFAULT_SNAPSHOT_TTL,
            capitalize_priority: false,
        }
    }
}

/// A ticket as entered by a user.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTicket {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Free-form priority; normalized leniently.
    #[serde(default)]
    pub priority: Option<String>,
    /// URLs of attachments that were already uploaded.
    #[serde(default, alias = "image_urls")]
    pub image_urls: Vec<String>,
}

/// Owns the broker, cache, archive and notifier handles and runs every
/// ticket operation against them.
pub struct TicketPipeline {
    publisher: TicketPublisher,
    drainer: QueueDrainer,
    reconciler: Reconciler,
    archiver: Archiver,
    cache: Arc<dyn CacheStore>,
    archive: Arc<dyn ArchiveStore>,
    /// One drain at a time per process (single logical consumer).
    drain_lock: Mutex<()>,
}

impl TicketPipeline {
    pub fn new(
        source: Arc<dyn MessageSource>,
        cache: Arc<dyn CacheStore>,
        archive: Arc<dyn ArchiveStore>,
        notifier: Arc<dyn Notifier>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            publisher: TicketPublisher::new(Arc::clone(&source), settings.capitalize_priority),
            drainer: QueueDrainer::new(source, settings.drain),
            reconciler: Reconciler::new(Arc::clone(&cache), notifier, settings.cache_ttl),
            archiver: Archiver::new(Arc::clone(&cache), Arc::clone(&archive), settings.cache_ttl),
            cache,
            archive,
            drain_lock: Mutex::new(()),
        }
    }

    /// Submit a ticket on behalf of `submitter`.
    ///
    /// A publish failure is logged and reported through
    /// [`SubmitOutcome::published`]; the submission itself still succeeds.
    pub async fn submit(
        &self,
        submitter: Option<&str>,
        request: NewTicket,
    ) -> Result<SubmitOutcome, SubmitError> {
        let email = submitter
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .ok_or(SubmitError::Unauthenticated)?;

        let priority = request
            .priority
            .as_deref()
            .map(TicketPriority::from_input)
            .unwrap_or_default();
        let ticket = Ticket::new(
            request.title,
            request.description,
            priority,
            email,
            request.image_urls,
        );

        let (published, message_id) = match self
            .publisher
            .publish(&ticket, request.priority.as_deref())
            .await
        {
            Ok(message_id) => (true, Some(message_id)),
            Err(e) => {
                error!(ticket_id = %ticket.id, error = %e, "Error publishing ticket");
                (false, None)
            }
        };

        info!(
            ticket_id = %ticket.id,
            email = %ticket.submitted_by_email,
            priority = %ticket.priority,
            published,
            "Ticket submitted"
        );

        Ok(SubmitOutcome {
            ticket,
            published,
            message_id,
        })
    }

    /// Open tickets ordered High, Medium, Low (stable within a priority).
    pub async fn open_tickets(&self) -> Result<Vec<Ticket>, PipelineError> {
        let mut tickets = load_snapshot(self.cache.as_ref()).await?;
        tickets.sort_by_key(|t| t.priority);
        Ok(tickets)
    }

    /// One open ticket by id.
    pub async fn open_ticket(&self, id: &str) -> Result<Option<Ticket>, PipelineError> {
        let tickets = load_snapshot(self.cache.as_ref()).await?;
        Ok(tickets.into_iter().find(|t| t.id == id))
    }

    /// The configured refresh window.
    pub fn drain_window(&self) -> Duration {
        self.drainer.config().window()
    }

    /// Drain with an explicit window, serialized with other drains.
    pub async fn drain(
        &self,
        max_duration: Duration,
        auto_ack: bool,
        cancel: Option<&CancellationToken>,
    ) -> Result<DrainBatch, PipelineError> {
        let _guard = self.drain_lock.lock().await;
        Ok(self.drainer.drain(max_duration, auto_ack, cancel).await?)
    }

    /// Drain for the configured window, then reconcile the batch.
    ///
    /// A cancelled drain still reconciles what it already acknowledged.
    pub async fn refresh(
        &self,
        cancel: Option<&CancellationToken>,
    ) -> Result<RefreshReport, PipelineError> {
        let _guard = self.drain_lock.lock().await;
        let window = self.drainer.config().window();
        let batch = self.drainer.drain(window, true, cancel).await?;
        let report = match self.reconciler.reconcile(&batch.tickets).await {
            Ok(report) => report,
            Err(e) => {
                // Already acked, so the log is the only remaining copy
                for ticket in &batch.tickets {
                    let record = serde_json::to_string(ticket).unwrap_or_default();
                    error!(
                        ticket_id = %ticket.id,
                        ticket = %record,
                        error = %e,
                        "Drained ticket not admitted"
                    );
                }
                return Err(e);
            }
        };
        Ok(RefreshReport::new(batch.stats, report))
    }

    /// Close an open ticket and archive it.
    pub async fn close(&self, id: &str) -> Result<CloseOutcome, PipelineError> {
        self.archiver.close(id).await
    }

    /// Read one archived ticket.
    pub async fn archived_ticket(
        &self,
        email: &str,
        id: &str,
    ) -> Result<Option<Ticket>, PipelineError> {
        Ok(self.archive.get(email, id).await?)
    }

    /// All archived tickets of one user.
    pub async fn archived_tickets(&self, email: &str) -> Result<Vec<Ticket>, PipelineError> {
        Ok(self.archive.list_for_user(email).await?)
    }
}
