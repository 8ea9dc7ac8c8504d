//! Google Cloud Pub/Sub backend over the REST API.
//!
//! Works against the real service (with a bearer token) or the local
//! emulator (point `endpoint` at it and leave the token unset).

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::PubSubConfig;
use crate::metrics::record_external_call;

use super::{
    Attributes, BrokerError, InboundMessage, MessageSource, OutboundMessage, ReceiveSession, Reply,
};

const SERVICE: &str = "pubsub";

/// Pub/Sub REST client bound to one topic and one subscription.
#[derive(Clone)]
pub struct PubSubClient {
    client: Client,
    config: PubSubConfig,
}

impl PubSubClient {
    /// Create a new client with the given configuration.
    pub fn new(config: PubSubConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .build()
            .expect("Failed to create HTTP client");

        Self { client, config }
    }

    fn base_url(&self) -> &str {
        self.config.endpoint.trim_end_matches('/')
    }

    fn topic_url(&self) -> String {
        format!(
            "{}/v1/projects/{}/topics/{}",
            self.base_url(),
            urlencoding::encode(&self.config.project_id),
            urlencoding::encode(&self.config.topic_id)
        )
    }

    fn subscription_url(&self) -> String {
        format!(
            "{}/v1/projects/{}/subscriptions/{}",
            self.base_url(),
            urlencoding::encode(&self.config.project_id),
            urlencoding::encode(&self.config.subscription_id)
        )
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.config.access_token.as_deref() {
            Some(token) if !token.is_empty() => request.bearer_auth(token),
            _ => request,
        }
    }

    /// Send a request, recording metrics and mapping transport errors.
    async fn send(&self, operation: &str, request: RequestBuilder) -> Result<Response, BrokerError> {
        let start = Instant::now();
        let result = self.authorize(request).send().await;
        let elapsed = start.elapsed();

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                record_external_call(SERVICE, operation, false, elapsed);
                return Err(map_transport_error(e));
            }
        };

        record_external_call(SERVICE, operation, response.status().is_success(), elapsed);
        Ok(response)
    }

    async fn post_json<B: Serialize>(
        &self,
        operation: &str,
        url: String,
        body: &B,
    ) -> Result<Response, BrokerError> {
        let response = self
            .send(operation, self.client.post(&url).json(body))
            .await?;
        ensure_success(response).await
    }

    async fn pull_messages(&self, max_messages: usize) -> Result<Vec<InboundMessage>, BrokerError> {
        let url = format!("{}:pull", self.subscription_url());
        let body = PullRequest {
            max_messages,
            return_immediately: true,
        };

        let response: PullResponse = self
            .post_json("pull", url, &body)
            .await?
            .json()
            .await
            .map_err(|e| BrokerError::ApiError(format!("Failed to parse response: {}", e)))?;

        Ok(response
            .received_messages
            .into_iter()
            .map(ReceivedMessage::into_inbound)
            .collect())
    }

    async fn acknowledge(&self, ack_ids: Vec<String>) -> Result<(), BrokerError> {
        let url = format!("{}:acknowledge", self.subscription_url());
        self.post_json("acknowledge", url, &AcknowledgeRequest { ack_ids })
            .await?;
        Ok(())
    }

    /// Nack by setting the ack deadline to zero, making the messages
    /// immediately eligible for redelivery.
    async fn release(&self, ack_ids: Vec<String>) -> Result<(), BrokerError> {
        let url = format!("{}:modifyAckDeadline", self.subscription_url());
        let body = ModifyAckDeadlineRequest {
            ack_ids,
            ack_deadline_seconds: 0,
        };
        self.post_json("modify_ack_deadline", url, &body).await?;
        Ok(())
    }
}

#[async_trait]
impl MessageSource for PubSubClient {
    async fn publish(&self, message: OutboundMessage) -> Result<String, BrokerError> {
        let url = format!("{}:publish", self.topic_url());
        let body = PublishRequest {
            messages: vec![PubsubMessageOut {
                data: BASE64.encode(&message.payload),
                attributes: message.attributes,
            }],
        };

        let response: PublishResponse = self
            .post_json("publish", url, &body)
            .await?
            .json()
            .await
            .map_err(|e| BrokerError::ApiError(format!("Failed to parse response: {}", e)))?;

        let message_id = response
            .message_ids
            .into_iter()
            .next()
            .ok_or_else(|| BrokerError::ApiError("Publish returned no message id".to_string()))?;

        debug!(message_id = %message_id, topic = %self.config.topic_id, "Published message");
        Ok(message_id)
    }

    async fn open_session(&self) -> Result<Arc<dyn ReceiveSession>, BrokerError> {
        let response = self
            .send("get_subscription", self.client.get(self.subscription_url()))
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(BrokerError::SubscriptionNotFound(
                self.config.subscription_id.clone(),
            ));
        }
        ensure_success(response).await?;

        debug!(subscription = %self.config.subscription_id, "Opened Pub/Sub session");
        Ok(Arc::new(PubSubSession {
            client: self.clone(),
            outstanding: Mutex::new(HashSet::new()),
            stopped: AtomicBool::new(false),
        }))
    }

    fn name(&self) -> &'static str {
        "pubsub"
    }
}

/// A receive session; tracks unreplied ack ids so `stop` can release them.
struct PubSubSession {
    client: PubSubClient,
    outstanding: Mutex<HashSet<String>>,
    stopped: AtomicBool,
}

#[async_trait]
impl ReceiveSession for PubSubSession {
    async fn pull(&self, max_messages: usize) -> Result<Vec<InboundMessage>, BrokerError> {
        if self.stopped.load(Ordering::SeqCst) {
            return Err(BrokerError::SessionClosed);
        }

        // If this future is dropped mid-request the server-side lease simply
        // expires and the messages are redelivered.
        let messages = self.client.pull_messages(max_messages).await?;

        let mut outstanding = self.outstanding.lock().unwrap();
        outstanding.extend(messages.iter().map(|m| m.ack_id.clone()));
        Ok(messages)
    }

    async fn reply(&self, ack_id: &str, reply: Reply) -> Result<(), BrokerError> {
        let ack_ids = vec![ack_id.to_string()];
        match reply {
            Reply::Ack => self.client.acknowledge(ack_ids).await?,
            Reply::Nack => self.client.release(ack_ids).await?,
        }
        self.outstanding.lock().unwrap().remove(ack_id);
        Ok(())
    }

    async fn stop(&self) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }

        let abandoned: Vec<String> = self.outstanding.lock().unwrap().drain().collect();
        if abandoned.is_empty() {
            return;
        }

        let count = abandoned.len();
        if let Err(e) = self.client.release(abandoned).await {
            // Leases expire on their own; redelivery is only delayed.
            warn!(count, error = %e, "Failed to release unreplied Pub/Sub messages");
        }
    }
}

fn map_transport_error(e: reqwest::Error) -> BrokerError {
    if e.is_timeout() {
        BrokerError::Timeout
    } else if e.is_connect() {
        BrokerError::ConnectionFailed(e.to_string())
    } else {
        BrokerError::ApiError(e.to_string())
    }
}

async fn ensure_success(response: Response) -> Result<Response, BrokerError> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    Err(BrokerError::ApiError(format!(
        "HTTP {}: {}",
        status,
        body.chars().take(200).collect::<String>()
    )))
}

// =============================================================================
// Wire types
// =============================================================================

#[derive(Debug, Serialize)]
struct PublishRequest {
    messages: Vec<PubsubMessageOut>,
}

#[derive(Debug, Serialize)]
struct PubsubMessageOut {
    data: String,
    attributes: Attributes,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PublishResponse {
    #[serde(default)]
    message_ids: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PullRequest {
    max_messages: usize,
    return_immediately: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PullResponse {
    #[serde(default)]
    received_messages: Vec<ReceivedMessage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReceivedMessage {
    ack_id: String,
    message: PubsubMessageIn,
    /// Only populated when the subscription has a dead-letter policy.
    #[serde(default)]
    delivery_attempt: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PubsubMessageIn {
    #[serde(default)]
    data: String,
    #[serde(default)]
    attributes: Attributes,
    #[serde(default)]
    message_id: String,
    #[serde(default)]
    publish_time: Option<DateTime<Utc>>,
}

impl ReceivedMessage {
    fn into_inbound(self) -> InboundMessage {
        let payload = match BASE64.decode(self.message.data.as_bytes()) {
            Ok(bytes) => bytes,
            Err(e) => {
                // Left to the handler, which will fail to decode an empty ticket.
                warn!(
                    message_id = %self.message.message_id,
                    error = %e,
                    "Pub/Sub message data is not valid base64"
                );
                Vec::new()
            }
        };

        InboundMessage {
            message_id: self.message.message_id,
            ack_id: self.ack_id,
            payload,
            attributes: self.message.attributes,
            delivery_attempt: self.delivery_attempt.unwrap_or(0),
            publish_time: self.message.publish_time,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AcknowledgeRequest {
    ack_ids: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ModifyAckDeadlineRequest {
    ack_ids: Vec<String>,
    ack_deadline_seconds: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> PubSubConfig {
        PubSubConfig {
            project_id: "helpdesk".to_string(),
            topic_id: "tickets-topic".to_string(),
            subscription_id: "tickets-topic-sub".to_string(),
            endpoint: "http://localhost:8085/".to_string(),
            access_token: None,
            timeout_secs: 5,
        }
    }

    #[test]
    fn test_resource_urls() {
        let client = PubSubClient::new(test_config());
        assert_eq!(
            client.topic_url(),
            "http://localhost:8085/v1/projects/helpdesk/topics/tickets-topic"
        );
        assert_eq!(
            client.subscription_url(),
            "http://localhost:8085/v1/projects/helpdesk/subscriptions/tickets-topic-sub"
        );
    }

    #[test]
    fn test_resource_urls_encode_segments() {
        let mut config = test_config();
        config.topic_id = "tickets topic".to_string();
        let client = PubSubClient::new(config);
        assert!(client.topic_url().ends_with("/topics/tickets%20topic"));
    }

    #[test]
    fn test_publish_request_wire_format() {
        let body = PublishRequest {
            messages: vec![PubsubMessageOut {
                data: BASE64.encode(b"{}"),
                attributes: Attributes::from([("priority".to_string(), "high".to_string())]),
            }],
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["messages"][0]["data"], "e30=");
        assert_eq!(json["messages"][0]["attributes"]["priority"], "high");
    }

    #[test]
    fn test_pull_and_ack_request_wire_format() {
        let pull = serde_json::to_value(PullRequest {
            max_messages: 100,
            return_immediately: true,
        })
        .unwrap();
        assert_eq!(pull["maxMessages"], 100);
        assert_eq!(pull["returnImmediately"], true);

        let nack = serde_json::to_value(ModifyAckDeadlineRequest {
            ack_ids: vec!["a1".to_string()],
            ack_deadline_seconds: 0,
        })
        .unwrap();
        assert_eq!(nack["ackIds"][0], "a1");
        assert_eq!(nack["ackDeadlineSeconds"], 0);
    }

    #[test]
    fn test_parse_pull_response() {
        let json = r#"{
            "receivedMessages": [
                {
                    "ackId": "ack-1",
                    "message": {
                        "data": "eyJpZCI6IngifQ==",
                        "attributes": {"priority": "High"},
                        "messageId": "m-1",
                        "publishTime": "2024-05-01T10:00:00.123Z"
                    },
                    "deliveryAttempt": 3
                },
                {
                    "ackId": "ack-2",
                    "message": {"data": "!!not base64!!", "messageId": "m-2"}
                }
            ]
        }"#;
        let response: PullResponse = serde_json::from_str(json).unwrap();
        let messages: Vec<InboundMessage> = response
            .received_messages
            .into_iter()
            .map(ReceivedMessage::into_inbound)
            .collect();

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].payload, br#"{"id":"x"}"#);
        assert_eq!(messages[0].attribute("priority"), Some("High"));
        assert_eq!(messages[0].delivery_attempt, 3);
        assert!(messages[0].publish_time.is_some());

        assert!(messages[1].payload.is_empty());
        assert_eq!(messages[1].delivery_attempt, 0);
        assert!(messages[1].attributes.is_empty());
    }

    #[test]
    fn test_parse_empty_pull_response() {
        let response: PullResponse = serde_json::from_str("{}").unwrap();
        assert!(response.received_messages.is_empty());
    }

    #[tokio::test]
    async fn test_open_session_unreachable_endpoint() {
        let mut config = test_config();
        // Nothing listens on port 1.
        config.endpoint = "http://127.0.0.1:1".to_string();
        let client = PubSubClient::new(config);

        let result = client.open_session().await;
        assert!(matches!(
            result,
            Err(BrokerError::ConnectionFailed(_)) | Err(BrokerError::Timeout)
        ));
    }
}
