//! Merging drained tickets into the open-ticket cache.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::cache::{load_snapshot, save_snapshot, CacheStore};
use crate::metrics;
use crate::notifier::{Notification, Notifier};
use crate::ticket::{Ticket, TicketStatus};

use super::types::{NotificationFailure, PipelineError, ReconcileReport};

/// Admits previously unseen tickets into the cache and notifies technicians.
#[derive(Clone)]
pub struct Reconciler {
    cache: Arc<dyn CacheStore>,
    notifier: Arc<dyn Notifier>,
    ttl: Duration,
}

impl Reconciler {
    pub fn new(cache: Arc<dyn CacheStore>, notifier: Arc<dyn Notifier>, ttl: Duration) -> Self {
        Self {
            cache,
            notifier,
            ttl,
        }
    }

    /// Reconcile one drain batch.
    ///
    /// Tickets whose id is already cached (or appeared earlier in the batch)
    /// are skipped. When nothing is admitted the cache is not written and no
    /// one is notified. Otherwise the merged snapshot is written first and
    /// each admitted ticket then produces one notification; failed
    /// notifications are collected in the report.
    pub async fn reconcile(&self, batch: &[Ticket]) -> Result<ReconcileReport, PipelineError> {
        let mut snapshot = load_snapshot(self.cache.as_ref()).await?;
        let mut known: HashSet<String> = snapshot.iter().map(|t| t.id.clone()).collect();

        let mut report = ReconcileReport::default();
        for ticket in batch {
            if known.insert(ticket.id.clone()) {
                report
                    .admitted
                    .push(ticket.clone().with_status(TicketStatus::Open));
            } else {
                report.duplicates_skipped += 1;
            }
        }

        metrics::DUPLICATES_SKIPPED.inc_by(report.duplicates_skipped as u64);

        if report.admitted.is_empty() {
            debug!(
                batch = batch.len(),
                duplicates = report.duplicates_skipped,
                "Nothing new to admit"
            );
            return Ok(report);
        }

        snapshot.extend(report.admitted.iter().cloned());
        save_snapshot(self.cache.as_ref(), &snapshot, self.ttl).await?;
        metrics::TICKETS_ADMITTED.inc_by(report.admitted.len() as u64);

        info!(
            admitted = report.admitted.len(),
            duplicates = report.duplicates_skipped,
            open = snapshot.len(),
            "Admitted new tickets"
        );

        for ticket in &report.admitted {
            let notification = Notification::new_ticket(ticket);
            match self.notifier.notify(&notification).await {
                Ok(()) => {
                    metrics::NOTIFICATIONS.with_label_values(&["sent"]).inc();
                }
                Err(e) => {
                    metrics::NOTIFICATIONS.with_label_values(&["failed"]).inc();
                    warn!(
                        ticket_id = %ticket.id,
                        notifier = self.notifier.name(),
                        error = %e,
                        "Failed to notify technicians"
                    );
                    report.notification_failures.push(NotificationFailure {
                        ticket_id: ticket.id.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        Ok(report)
    }
}
