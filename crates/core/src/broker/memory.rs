//! In-process broker for single-instance deployments and tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::debug;

use super::{
    Attributes, BrokerError, InboundMessage, MessageSource, OutboundMessage, ReceiveSession, Reply,
};

#[derive(Debug, Clone)]
struct Envelope {
    message_id: String,
    payload: Vec<u8>,
    attributes: Attributes,
    delivery_attempt: u32,
    publish_time: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct BrokerState {
    queue: VecDeque<Envelope>,
    /// ack_id -> (session id, envelope)
    in_flight: HashMap<String, (u64, Envelope)>,
    next_session: u64,
}

/// One topic with one subscription, held in memory.
///
/// Nacked and abandoned deliveries go back to the end of the queue with their
/// attempt counter preserved, so the next pull sees `delivery_attempt + 1`.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBroker {
    state: Arc<Mutex<BrokerState>>,
}

impl InMemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages waiting to be pulled.
    pub async fn pending_count(&self) -> usize {
        self.state.lock().await.queue.len()
    }

    /// Deliveries handed out but not yet acked or nacked.
    pub async fn in_flight_count(&self) -> usize {
        self.state.lock().await.in_flight.len()
    }
}

#[async_trait]
impl MessageSource for InMemoryBroker {
    async fn publish(&self, message: OutboundMessage) -> Result<String, BrokerError> {
        let message_id = uuid::Uuid::new_v4().to_string();
        let mut state = self.state.lock().await;
        state.queue.push_back(Envelope {
            message_id: message_id.clone(),
            payload: message.payload,
            attributes: message.attributes,
            delivery_attempt: 0,
            publish_time: Utc::now(),
        });
        debug!(message_id = %message_id, "Published message to in-memory broker");
        Ok(message_id)
    }

    async fn open_session(&self) -> Result<Arc<dyn ReceiveSession>, BrokerError> {
        let mut state = self.state.lock().await;
        state.next_session += 1;
        Ok(Arc::new(MemorySession {
            id: state.next_session,
            state: Arc::clone(&self.state),
            stopped: AtomicBool::new(false),
        }))
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

struct MemorySession {
    id: u64,
    state: Arc<Mutex<BrokerState>>,
    stopped: AtomicBool,
}

#[async_trait]
impl ReceiveSession for MemorySession {
    async fn pull(&self, max_messages: usize) -> Result<Vec<InboundMessage>, BrokerError> {
        if self.stopped.load(Ordering::SeqCst) {
            return Err(BrokerError::SessionClosed);
        }

        let mut state = self.state.lock().await;
        let count = max_messages.min(state.queue.len());
        let mut messages = Vec::with_capacity(count);

        for _ in 0..count {
            let Some(mut envelope) = state.queue.pop_front() else {
                break;
            };
            envelope.delivery_attempt += 1;
            let ack_id = uuid::Uuid::new_v4().to_string();

            messages.push(InboundMessage {
                message_id: envelope.message_id.clone(),
                ack_id: ack_id.clone(),
                payload: envelope.payload.clone(),
                attributes: envelope.attributes.clone(),
                delivery_attempt: envelope.delivery_attempt,
                publish_time: Some(envelope.publish_time),
            });
            state.in_flight.insert(ack_id, (self.id, envelope));
        }

        Ok(messages)
    }

    async fn reply(&self, ack_id: &str, reply: Reply) -> Result<(), BrokerError> {
        let mut state = self.state.lock().await;
        let (_, envelope) = state
            .in_flight
            .remove(ack_id)
            .ok_or_else(|| BrokerError::ApiError(format!("Unknown ack id: {}", ack_id)))?;

        if reply == Reply::Nack {
            state.queue.push_back(envelope);
        }
        Ok(())
    }

    async fn stop(&self) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }

        let mut state = self.state.lock().await;
        let abandoned: Vec<String> = state
            .in_flight
            .iter()
            .filter(|(_, (session, _))| *session == self.id)
            .map(|(ack_id, _)| ack_id.clone())
            .collect();

        for ack_id in abandoned {
            if let Some((_, envelope)) = state.in_flight.remove(&ack_id) {
                state.queue.push_back(envelope);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(body: &str) -> OutboundMessage {
        OutboundMessage {
            payload: body.as_bytes().to_vec(),
            attributes: Attributes::from([("priority".to_string(), "High".to_string())]),
        }
    }

    #[tokio::test]
    async fn test_publish_then_pull() {
        let broker = InMemoryBroker::new();
        broker.publish(message("one")).await.unwrap();
        broker.publish(message("two")).await.unwrap();

        let session = broker.open_session().await.unwrap();
        let pulled = session.pull(10).await.unwrap();

        assert_eq!(pulled.len(), 2);
        assert_eq!(pulled[0].payload, b"one");
        assert_eq!(pulled[1].payload, b"two");
        assert_eq!(pulled[0].delivery_attempt, 1);
        assert_eq!(pulled[0].attribute("priority"), Some("High"));
        assert_eq!(broker.in_flight_count().await, 2);
    }

    #[tokio::test]
    async fn test_pull_respects_max_messages() {
        let broker = InMemoryBroker::new();
        for i in 0..5 {
            broker.publish(message(&i.to_string())).await.unwrap();
        }

        let session = broker.open_session().await.unwrap();
        assert_eq!(session.pull(2).await.unwrap().len(), 2);
        assert_eq!(broker.pending_count().await, 3);
    }

    #[tokio::test]
    async fn test_pull_empty_returns_immediately() {
        let broker = InMemoryBroker::new();
        let session = broker.open_session().await.unwrap();
        assert!(session.pull(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_ack_removes_message() {
        let broker = InMemoryBroker::new();
        broker.publish(message("one")).await.unwrap();

        let session = broker.open_session().await.unwrap();
        let pulled = session.pull(10).await.unwrap();
        session.reply(&pulled[0].ack_id, Reply::Ack).await.unwrap();

        assert_eq!(broker.pending_count().await, 0);
        assert_eq!(broker.in_flight_count().await, 0);
    }

    #[tokio::test]
    async fn test_nack_redelivers_with_incremented_attempt() {
        let broker = InMemoryBroker::new();
        let message_id = broker.publish(message("one")).await.unwrap();

        let session = broker.open_session().await.unwrap();
        let first = session.pull(10).await.unwrap();
        session.reply(&first[0].ack_id, Reply::Nack).await.unwrap();

        let second = session.pull(10).await.unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].message_id, message_id);
        assert_eq!(second[0].delivery_attempt, 2);
        assert_ne!(second[0].ack_id, first[0].ack_id);
    }

    #[tokio::test]
    async fn test_reply_unknown_ack_id_fails() {
        let broker = InMemoryBroker::new();
        let session = broker.open_session().await.unwrap();
        let result = session.reply("nope", Reply::Ack).await;
        assert!(matches!(result, Err(BrokerError::ApiError(_))));
    }

    #[tokio::test]
    async fn test_stop_requeues_unreplied_deliveries() {
        let broker = InMemoryBroker::new();
        broker.publish(message("one")).await.unwrap();

        let session = broker.open_session().await.unwrap();
        session.pull(10).await.unwrap();
        session.stop().await;

        assert_eq!(broker.in_flight_count().await, 0);
        assert_eq!(broker.pending_count().await, 1);
        assert!(matches!(
            session.pull(10).await,
            Err(BrokerError::SessionClosed)
        ));
    }

    #[tokio::test]
    async fn test_stop_leaves_other_sessions_alone() {
        let broker = InMemoryBroker::new();
        broker.publish(message("one")).await.unwrap();
        broker.publish(message("two")).await.unwrap();

        let first = broker.open_session().await.unwrap();
        let second = broker.open_session().await.unwrap();
        first.pull(1).await.unwrap();
        second.pull(1).await.unwrap();

        first.stop().await;

        assert_eq!(broker.in_flight_count().await, 1);
        assert_eq!(broker.pending_count().await, 1);
    }
}
