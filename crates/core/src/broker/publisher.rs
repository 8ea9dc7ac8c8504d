//! Publishing tickets to the broker.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, warn};

use crate::metrics;
use crate::ticket::{
    canonical_priority_attribute, normalize_priority_attribute, Ticket, PRIORITY_ATTRIBUTE,
};

use super::{Attributes, BrokerError, MessageSource, OutboundMessage};

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("Failed to encode ticket: {0}")]
    Encode(String),

    #[error(transparent)]
    Broker(#[from] BrokerError),
}

/// Publishes tickets as JSON with a single `priority` attribute.
#[derive(Clone)]
pub struct TicketPublisher {
    source: Arc<dyn MessageSource>,
    capitalize_priority: bool,
}

impl TicketPublisher {
    pub fn new(source: Arc<dyn MessageSource>, capitalize_priority: bool) -> Self {
        Self {
            source,
            capitalize_priority,
        }
    }

    /// Compute the attribute map for a raw priority input.
    ///
    /// By default valid values keep their lower-cased form ("high") while
    /// invalid ones fall back to "Medium"; the drain side ranks only the
    /// capitalized forms. `capitalize_priority` switches to "High"/"Medium"/"Low".
    pub fn attributes_for(&self, priority_input: Option<&str>) -> Attributes {
        let value = if self.capitalize_priority {
            canonical_priority_attribute(priority_input)
        } else {
            normalize_priority_attribute(priority_input)
        };
        Attributes::from([(PRIORITY_ATTRIBUTE.to_string(), value)])
    }

    /// Publish a ticket, returning the broker message id.
    pub async fn publish(
        &self,
        ticket: &Ticket,
        priority_input: Option<&str>,
    ) -> Result<String, PublishError> {
        let payload = ticket
            .to_payload()
            .map_err(|e| PublishError::Encode(e.to_string()))?;
        let message = OutboundMessage {
            payload,
            attributes: self.attributes_for(priority_input),
        };

        match self.source.publish(message).await {
            Ok(message_id) => {
                metrics::PUBLISHES.with_label_values(&["success"]).inc();
                debug!(
                    ticket_id = %ticket.id,
                    message_id = %message_id,
                    broker = self.source.name(),
                    "Published ticket"
                );
                Ok(message_id)
            }
            Err(e) => {
                metrics::PUBLISHES.with_label_values(&["failed"]).inc();
                warn!(ticket_id = %ticket.id, error = %e, "Failed to publish ticket");
                Err(e.into())
            }
        }
    }
}
