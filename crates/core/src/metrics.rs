//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Queue drains (messages by outcome, drain duration, dead letters)
//! - Reconciliation (admissions, duplicates, notifications)
//! - Archiving and publishing
//! - External services (Pub/Sub, Mailgun)

use std::time::Duration;

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Drain Metrics
// =============================================================================

/// Drained messages by handling outcome.
pub static DRAINED_MESSAGES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "ticketline_drained_messages_total",
            "Messages received during queue drains",
        ),
        &["outcome"], // "acked", "nacked", "dead_lettered"
    )
    .unwrap()
});

/// Drain wall-clock duration in seconds.
pub static DRAIN_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "ticketline_drain_duration_seconds",
            "Duration of queue drain sessions",
        )
        .buckets(vec![0.5, 1.0, 2.5, 5.0, 7.5, 10.0, 30.0, 60.0]),
        &["result"], // "completed", "cancelled"
    )
    .unwrap()
});

/// Messages that failed to decode as a ticket.
pub static DECODE_FAILURES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "ticketline_decode_failures_total",
        "Drained messages whose payload was not a valid ticket",
    )
    .unwrap()
});

// =============================================================================
// Reconciliation Metrics
// =============================================================================

/// Tickets admitted into the live cache.
pub static TICKETS_ADMITTED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "ticketline_tickets_admitted_total",
        "Tickets admitted into the open-ticket cache",
    )
    .unwrap()
});

/// Drained tickets skipped because their id was already cached.
pub static DUPLICATES_SKIPPED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "ticketline_duplicates_skipped_total",
        "Drained tickets skipped as duplicates",
    )
    .unwrap()
});

/// Notifications by result.
pub static NOTIFICATIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("ticketline_notifications_total", "Technician notifications"),
        &["result"], // "sent", "failed"
    )
    .unwrap()
});

// =============================================================================
// Archive / Publish Metrics
// =============================================================================

/// Close requests by result.
pub static ARCHIVES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("ticketline_archives_total", "Ticket close requests"),
        &["result"], // "archived", "not_found", "failed"
    )
    .unwrap()
});

/// Ticket publishes by result.
pub static PUBLISHES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("ticketline_publishes_total", "Ticket publishes to the broker"),
        &["result"], // "success", "failed"
    )
    .unwrap()
});

// =============================================================================
// External Service Metrics
// =============================================================================

/// External service request duration.
pub static EXTERNAL_SERVICE_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "ticketline_external_service_duration_seconds",
            "Duration of external service calls",
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        &["service", "operation"],
    )
    .unwrap()
});

/// External service requests total.
pub static EXTERNAL_SERVICE_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "ticketline_external_service_requests_total",
            "Total external service requests",
        ),
        &["service", "operation", "status"], // status: "success", "error"
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Record one external service call.
pub fn record_external_call(service: &str, operation: &str, success: bool, elapsed: Duration) {
    let status = if success { "success" } else { "error" };
    EXTERNAL_SERVICE_REQUESTS
        .with_label_values(&[service, operation, status])
        .inc();
    EXTERNAL_SERVICE_DURATION
        .with_label_values(&[service, operation])
        .observe(elapsed.as_secs_f64());
}

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Drain
        Box::new(DRAINED_MESSAGES.clone()),
        Box::new(DRAIN_DURATION.clone()),
        Box::new(DECODE_FAILURES.clone()),
        // Reconciliation
        Box::new(TICKETS_ADMITTED.clone()),
        Box::new(DUPLICATES_SKIPPED.clone()),
        Box::new(NOTIFICATIONS.clone()),
        // Archive / publish
        Box::new(ARCHIVES.clone()),
        Box::new(PUBLISHES.clone()),
        // External services
        Box::new(EXTERNAL_SERVICE_DURATION.clone()),
        Box::new(EXTERNAL_SERVICE_REQUESTS.clone()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_external_call_increments_counter() {
        let before = EXTERNAL_SERVICE_REQUESTS
            .with_label_values(&["test_service", "op", "success"])
            .get();

        record_external_call("test_service", "op", true, Duration::from_millis(10));

        let after = EXTERNAL_SERVICE_REQUESTS
            .with_label_values(&["test_service", "op", "success"])
            .get();
        assert_eq!(after, before + 1);
    }

    #[test]
    fn test_all_metrics_registers_cleanly() {
        let registry = prometheus::Registry::new();
        for metric in all_metrics() {
            registry.register(metric).unwrap();
        }
    }
}
