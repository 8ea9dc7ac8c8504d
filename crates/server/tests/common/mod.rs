//! Common test utilities for E2E testing with mocks.
//!
//! This module provides a test fixture that creates an in-process server
//! with mock dependencies injected, enabling E2E testing of the HTTP API
//! without a real broker, cache, archive or mail service.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use ticketline_core::{
    cache::SNAPSHOT_KEY,
    create_authenticator,
    pipeline::{DrainConfig, IngestConfig, PipelineSettings},
    testing::{MockArchiveStore, MockBroker, MockCacheStore, MockNotifier},
    load_config_from_str, IngestLoop, Ticket, TicketPipeline,
};
use ticketline_server::state::AppState;

/// Re-export fixtures for test convenience
pub use ticketline_core::testing::fixtures;

/// Header carrying the submitter email.
pub const EMAIL_HEADER: &str = "X-User-Email";

/// Test fixture for E2E testing with mock dependencies.
///
/// Provides an in-process server with fully controllable mocks for:
/// - The message broker (MockBroker)
/// - The open-ticket cache (MockCacheStore)
/// - The archive (MockArchiveStore)
/// - Technician notifications (MockNotifier)
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_ticket_submission() {
///     let fixture = TestFixture::new().await;
///
///     let response = fixture
///         .post_as("/api/v1/tickets", "jane@example.com", json!({ "title": "Test" }))
///         .await;
///
///     assert_eq!(response.status, 201);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    pub broker: MockBroker,
    pub cache: MockCacheStore,
    pub archive: MockArchiveStore,
    pub notifier: MockNotifier,
    pub ingest: Arc<IngestLoop>,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

/// Configuration for test fixture.
#[derive(Debug, Clone, Default)]
pub struct TestConfig {
    /// Require this API key when set
    pub api_key: Option<String>,
    /// Publish capitalized priority attributes
    pub capitalize_priority: bool,
}

impl TestConfig {
    pub fn with_api_key(key: &str) -> Self {
        Self {
            api_key: Some(key.to_string()),
            ..Self::default()
        }
    }
}

impl TestFixture {
    /// Create a new test fixture with default mocks.
    pub async fn new() -> Self {
        Self::with_config(TestConfig::default()).await
    }

    /// Create a test fixture with custom configuration.
    pub async fn with_config(test_config: TestConfig) -> Self {
        let auth = match &test_config.api_key {
            Some(key) => format!("[auth]\nmethod = \"api_key\"\napi_key = \"{}\"\n", key),
            None => "[auth]\nmethod = \"none\"\n".to_string(),
        };
        let config = load_config_from_str(&format!(
            "{}\n[broker]\ncapitalize_priority = {}\n\n[drain]\nwindow_secs = 1\nidle_poll_ms = 10\n",
            auth, test_config.capitalize_priority
        ))
        .expect("Failed to parse test config");

        let broker = MockBroker::new();
        let cache = MockCacheStore::new();
        let archive = MockArchiveStore::new();
        let notifier = MockNotifier::new();

        let pipeline = Arc::new(TicketPipeline::new(
            Arc::new(broker.clone()),
            Arc::new(cache.clone()),
            Arc::new(archive.clone()),
            Arc::new(notifier.clone()),
            PipelineSettings {
                drain: DrainConfig {
                    window_secs: 1,
                    idle_poll_ms: 10,
                    ..DrainConfig::default()
                },
                cache_ttl: Duration::from_secs(604_800),
                capitalize_priority: test_config.capitalize_priority,
            },
        ));
        let ingest = Arc::new(IngestLoop::new(
            Arc::clone(&pipeline),
            IngestConfig {
                enabled: false,
                poll_interval_ms: 60_000,
            },
        ));

        let authenticator =
            create_authenticator(&config.auth).expect("Failed to create authenticator");
        let state = Arc::new(AppState::new(
            config,
            authenticator,
            pipeline,
            Arc::clone(&ingest),
        ));

        let router = ticketline_server::api::create_router(state);

        Self {
            router,
            broker,
            cache,
            archive,
            notifier,
            ingest,
        }
    }

    /// Seed the open-ticket cache directly.
    pub async fn seed_open_tickets(&self, tickets: &[Ticket]) {
        let bytes = serde_json::to_vec(tickets).expect("Failed to encode tickets");
        self.cache.insert_raw(SNAPSHOT_KEY, bytes).await;
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, &[], None).await
    }

    /// Send a GET request on behalf of a user.
    pub async fn get_as(&self, path: &str, email: &str) -> TestResponse {
        self.request("GET", path, &[(EMAIL_HEADER, email)], None)
            .await
    }

    /// Send a POST request with optional JSON body.
    pub async fn post(&self, path: &str, body: Option<Value>) -> TestResponse {
        self.request("POST", path, &[], body).await
    }

    /// Send a POST request on behalf of a user.
    pub async fn post_as(&self, path: &str, email: &str, body: Value) -> TestResponse {
        self.request("POST", path, &[(EMAIL_HEADER, email)], Some(body))
            .await
    }

    /// Send a request with extra headers.
    pub async fn request_with_headers(
        &self,
        method: &str,
        path: &str,
        headers: &[(&str, &str)],
    ) -> TestResponse {
        self.request(method, path, headers, None).await
    }

    /// Send a POST request with raw string body (for testing malformed JSON).
    pub async fn post_raw_as(&self, path: &str, email: &str, body: &str) -> TestResponse {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header("Content-Type", "application/json")
            .header(EMAIL_HEADER, email)
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    /// Send a GET request and return the raw text body.
    pub async fn get_text(&self, path: &str) -> (StatusCode, String) {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();
        (status, String::from_utf8_lossy(&bytes).to_string())
    }

    async fn request(
        &self,
        method: &str,
        path: &str,
        headers: &[(&str, &str)],
        body: Option<Value>,
    ) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);
        for (name, value) in headers {
            request_builder = request_builder.header(*name, *value);
        }

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        self.send(request_builder.body(body).unwrap()).await
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body }
    }
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status,
            $response.status,
            serde_json::to_string_pretty(&$response.body).unwrap_or_default()
        );
    };
}
