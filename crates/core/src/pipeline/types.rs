//! Result and error types for the ticket pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::archive::ArchiveError;
use crate::broker::BrokerError;
use crate::cache::CacheError;
use crate::ticket::Ticket;

/// Errors from a queue drain.
#[derive(Debug, Error)]
pub enum DrainError {
    /// The receive session could not be opened; nothing was drained.
    #[error("failed to open receive session: {0}")]
    SessionSetup(#[from] BrokerError),
}

/// Errors from reconcile, close and refresh.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("drain failed: {0}")]
    Drain(#[from] DrainError),

    #[error("cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("archive error: {0}")]
    Archive(#[from] ArchiveError),
}

/// Errors from ticket submission.
#[derive(Debug, Error)]
pub enum SubmitError {
    /// No submitter email available.
    #[error("user not authenticated")]
    Unauthenticated,
}

/// Counters for one drain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrainStats {
    pub received: usize,
    pub acked: usize,
    pub nacked: usize,
    pub decode_failures: usize,
    pub dead_lettered: usize,
    /// Replies the broker rejected (the message will be redelivered).
    pub reply_failures: usize,
    pub cancelled: bool,
    pub elapsed_ms: u64,
}

/// Output of a drain: decoded tickets in priority order plus counters.
#[derive(Debug, Clone, Default)]
pub struct DrainBatch {
    pub tickets: Vec<Ticket>,
    pub stats: DrainStats,
}

/// A notification that could not be delivered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationFailure {
    pub ticket_id: String,
    pub error: String,
}

/// Outcome of reconciling one drain batch against the cache.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReconcileReport {
    /// Newly admitted tickets, in admission order, with status `Open`.
    pub admitted: Vec<Ticket>,
    pub duplicates_skipped: usize,
    pub notification_failures: Vec<NotificationFailure>,
}

/// Outcome of closing a ticket.
#[derive(Debug, Clone, PartialEq)]
pub enum CloseOutcome {
    /// Removed from the cache and archived; carries the archived record.
    Closed(Ticket),
    /// No open ticket with that id.
    NotFound,
}

/// Outcome of a submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitOutcome {
    pub ticket: Ticket,
    /// False when the broker publish failed; the ticket is still accepted.
    pub published: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
}

/// Outcome of one refresh (drain + reconcile).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshReport {
    pub drain: DrainStats,
    pub admitted: Vec<Ticket>,
    pub duplicates_skipped: usize,
    pub notification_failures: Vec<NotificationFailure>,
}

impl RefreshReport {
    pub fn new(drain: DrainStats, reconcile: ReconcileReport) -> Self {
        Self {
            drain,
            admitted: reconcile.admitted,
            duplicates_skipped: reconcile.duplicates_skipped,
            notification_failures: reconcile.notification_failures,
        }
    }
}

/// Current state of the background ingest loop.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngestStatus {
    pub running: bool,
    pub total_runs: u64,
    pub total_admitted: u64,
    pub last_run_at: Option<DateTime<Utc>>,
    pub last_admitted: Option<usize>,
    pub last_error: Option<String>,
}
