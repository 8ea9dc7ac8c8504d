//! Testing utilities and mock implementations for E2E tests.
//!
//! This module provides mock implementations of the external service traits
//! (broker, cache, archive, notifier), allowing pipeline and HTTP tests to
//! run without real infrastructure.
//!
//! # Example
//!
//! ```rust,ignore
//! use ticketline_core::testing::{MockBroker, MockCacheStore, MockNotifier};
//!
//! let broker = MockBroker::new();
//! let cache = MockCacheStore::new();
//! let notifier = MockNotifier::new();
//!
//! // Inject failures
//! notifier.fail_for_ticket("ticket-1").await;
//! cache.fail_next_set(CacheError::Unavailable("down".into())).await;
//!
//! // Use in TicketPipeline...
//! ```

mod mock_archive;
mod mock_broker;
mod mock_cache;
mod mock_notifier;

pub use mock_archive::MockArchiveStore;
pub use mock_broker::MockBroker;
pub use mock_cache::{MockCacheStore, RecordedSet};
pub use mock_notifier::MockNotifier;

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::broker::{Attributes, OutboundMessage};
    use crate::ticket::{Ticket, TicketPriority, TicketStatus, PRIORITY_ATTRIBUTE};

    /// Create a queued ticket with reasonable defaults.
    pub fn ticket(title: &str, priority: TicketPriority) -> Ticket {
        Ticket::new(
            title,
            format!("{} (description)", title),
            priority,
            "user@example.com",
            vec![],
        )
    }

    /// Create a ticket with a fixed id, as already admitted into the cache.
    pub fn open_ticket(id: &str, title: &str, priority: TicketPriority) -> Ticket {
        let mut ticket = ticket(title, priority).with_status(TicketStatus::Open);
        ticket.id = id.to_string();
        ticket
    }

    /// Wrap a ticket as a broker message carrying `priority_attribute`.
    pub fn ticket_message(ticket: &Ticket, priority_attribute: Option<&str>) -> OutboundMessage {
        let mut attributes = Attributes::new();
        if let Some(value) = priority_attribute {
            attributes.insert(PRIORITY_ATTRIBUTE.to_string(), value.to_string());
        }
        OutboundMessage {
            payload: ticket.to_payload().unwrap_or_default(),
            attributes,
        }
    }
}
