//! Types for the message broker abstraction.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// String attributes attached to a message.
pub type Attributes = HashMap<String, String>;

/// Errors from broker operations.
#[derive(Debug, Clone, Error)]
pub enum BrokerError {
    #[error("Broker connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Broker request timed out")]
    Timeout,

    #[error("Subscription not found: {0}")]
    SubscriptionNotFound(String),

    #[error("Broker API error: {0}")]
    ApiError(String),

    #[error("Receive session is closed")]
    SessionClosed,
}

/// A message to publish.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundMessage {
    pub payload: Vec<u8>,
    pub attributes: Attributes,
}

/// A message received from a subscription.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    /// Broker-assigned message id.
    pub message_id: String,
    /// Handle used to ack or nack this particular delivery.
    pub ack_id: String,
    pub payload: Vec<u8>,
    pub attributes: Attributes,
    /// 1 on first delivery, incremented on every redelivery.
    /// 0 when the backend does not track attempts.
    pub delivery_attempt: u32,
    pub publish_time: Option<DateTime<Utc>>,
}

impl InboundMessage {
    /// Look up an attribute value.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }
}

/// Handler decision for a received message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    /// Processed; do not redeliver.
    Ack,
    /// Not processed; the broker redelivers per its own policy.
    Nack,
}

/// A message broker with publish and pull-style receive.
#[async_trait]
pub trait MessageSource: Send + Sync {
    /// Publish a message, returning the broker-assigned message id.
    async fn publish(&self, message: OutboundMessage) -> Result<String, BrokerError>;

    /// Open a receive session against the configured subscription.
    ///
    /// Failing here means the broker is unreachable; callers treat it as fatal.
    async fn open_session(&self) -> Result<Arc<dyn ReceiveSession>, BrokerError>;

    /// Backend name, for logs and metrics.
    fn name(&self) -> &'static str;
}

/// An open receive session.
///
/// Implementations must make `pull` cancel-safe: dropping the future before
/// it resolves must not lose messages that were not returned.
#[async_trait]
pub trait ReceiveSession: Send + Sync {
    /// Fetch up to `max_messages` currently available messages.
    ///
    /// Returns promptly with an empty vector when nothing is waiting.
    async fn pull(&self, max_messages: usize) -> Result<Vec<InboundMessage>, BrokerError>;

    /// Acknowledge or negatively acknowledge one delivery.
    async fn reply(&self, ack_id: &str, reply: Reply) -> Result<(), BrokerError>;

    /// Stop the session. Unreplied deliveries become eligible for redelivery.
    async fn stop(&self);
}
