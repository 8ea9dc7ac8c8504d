//! Mock broker for testing.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::broker::{
    BrokerError, InMemoryBroker, MessageSource, OutboundMessage, ReceiveSession,
};

/// Mock implementation of the MessageSource trait.
///
/// Behaves like [`InMemoryBroker`] (queueing, nack redelivery, requeue on
/// stop) and adds:
/// - Recording of published messages
/// - Failure injection for publish and session setup
#[derive(Debug, Clone, Default)]
pub struct MockBroker {
    inner: InMemoryBroker,
    published: Arc<RwLock<Vec<OutboundMessage>>>,
    publish_error: Arc<RwLock<Option<BrokerError>>>,
    session_error: Arc<RwLock<Option<BrokerError>>>,
    sessions_opened: Arc<RwLock<usize>>,
}

impl MockBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// The underlying queue, for inspecting pending/in-flight counts.
    pub fn queue(&self) -> &InMemoryBroker {
        &self.inner
    }

    /// Every publish fails with `error` until cleared.
    pub async fn fail_publish(&self, error: BrokerError) {
        *self.publish_error.write().await = Some(error);
    }

    /// Every session setup fails with `error` until cleared.
    pub async fn fail_sessions(&self, error: BrokerError) {
        *self.session_error.write().await = Some(error);
    }

    /// Clear all injected failures.
    pub async fn clear_failures(&self) {
        *self.publish_error.write().await = None;
        *self.session_error.write().await = None;
    }

    /// Messages successfully published, in order.
    pub async fn published(&self) -> Vec<OutboundMessage> {
        self.published.read().await.clone()
    }

    pub async fn sessions_opened(&self) -> usize {
        *self.sessions_opened.read().await
    }
}

#[async_trait]
impl MessageSource for MockBroker {
    async fn publish(&self, message: OutboundMessage) -> Result<String, BrokerError> {
        if let Some(error) = self.publish_error.read().await.clone() {
            return Err(error);
        }
        let message_id = self.inner.publish(message.clone()).await?;
        self.published.write().await.push(message);
        Ok(message_id)
    }

    async fn open_session(&self) -> Result<Arc<dyn ReceiveSession>, BrokerError> {
        if let Some(error) = self.session_error.read().await.clone() {
            return Err(error);
        }
        *self.sessions_opened.write().await += 1;
        self.inner.open_session().await
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
