//! Message broker abstraction.
//!
//! Tickets travel through one topic/subscription pair. Backends:
//! - [`InMemoryBroker`]: single process, for development and tests
//! - [`PubSubClient`]: Google Cloud Pub/Sub over REST (or its emulator)

mod memory;
mod publisher;
mod pubsub;
mod types;

pub use memory::InMemoryBroker;
pub use publisher::{PublishError, TicketPublisher};
pub use pubsub::PubSubClient;
pub use types::{
    Attributes, BrokerError, InboundMessage, MessageSource, OutboundMessage, ReceiveSession, Reply,
};

use std::sync::Arc;

use crate::config::{BrokerBackend, BrokerConfig};

/// Build the configured broker backend.
pub fn create_message_source(config: &BrokerConfig) -> Result<Arc<dyn MessageSource>, BrokerError> {
    match config.backend {
        BrokerBackend::Memory => Ok(Arc::new(InMemoryBroker::new())),
        BrokerBackend::Pubsub => {
            let pubsub = config.pubsub.clone().ok_or_else(|| {
                BrokerError::ApiError("broker.pubsub must be set for the pubsub backend".to_string())
            })?;
            Ok(Arc::new(PubSubClient::new(pubsub)))
        }
    }
}
