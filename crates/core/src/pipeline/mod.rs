//! Ticket ingestion pipeline.
//!
//! - **Drain**: time-boxed receive from the broker, priority ordered
//! - **Reconcile**: dedup against the cache snapshot, admit, notify
//! - **Archive**: close an open ticket into the per-user store
//! - **Ingest loop**: optional background refresh

mod archiver;
mod config;
mod drainer;
mod ingest;
mod reconciler;
mod service;
mod types;

pub use archiver::Archiver;
pub use config::{DrainConfig, IngestConfig};
pub use drainer::QueueDrainer;
pub use ingest::IngestLoop;
pub use reconciler::Reconciler;
pub use service::{NewTicket, PipelineSettings, TicketPipeline};
pub use types::{
    CloseOutcome, DrainBatch, DrainError, DrainStats, IngestStatus, NotificationFailure,
    PipelineError, ReconcileReport, RefreshReport, SubmitError, SubmitOutcome,
};
