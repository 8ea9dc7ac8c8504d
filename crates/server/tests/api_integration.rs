//! End-to-end HTTP tests with mocked broker, cache, archive and notifier.
//!
//! These tests run the full router in-process and cover submission,
//! refresh, the open-ticket view, closing, the archive and the ingest loop.

mod common;

use axum::http::StatusCode;
use serde_json::json;
use ticketline_core::{
    archive::{ArchiveError, ArchiveStore},
    broker::BrokerError,
    cache::CacheError,
    ticket::{TicketPriority, TicketStatus},
    MessageSource,
};

use common::{fixtures, TestConfig, TestFixture};

// =============================================================================
// Basic API Tests
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let fixture = TestFixture::new().await;
    let response = fixture.get("/api/v1/health").await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["status"], "ok");
}

#[tokio::test]
async fn test_config_endpoint_is_sanitized() {
    let fixture = TestFixture::with_config(TestConfig::with_api_key("secret-key")).await;

    let response = fixture
        .request_with_headers("GET", "/api/v1/config", &[("X-API-Key", "secret-key")])
        .await;

    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["auth"]["method"], "api_key");
    let text = response.body.to_string();
    assert!(!text.contains("secret-key"));
}

#[tokio::test]
async fn test_api_key_required() {
    let fixture = TestFixture::with_config(TestConfig::with_api_key("secret-key")).await;

    let response = fixture.get("/api/v1/tickets").await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    let response = fixture
        .request_with_headers("GET", "/api/v1/tickets", &[("X-API-Key", "secret-key")])
        .await;
    assert_status!(response, StatusCode::OK);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let fixture = TestFixture::new().await;
    fixture.get("/api/v1/health").await;

    let (status, text) = fixture.get_text("/metrics").await;

    assert_eq!(status, StatusCode::OK);
    assert!(text.contains("ticketline_http_requests_total"));
    assert!(text.contains("ticketline_open_tickets"));
}

// =============================================================================
// Submission
// =============================================================================

#[tokio::test]
async fn test_submit_ticket() {
    let fixture = TestFixture::new().await;

    let response = fixture
        .post_as(
            "/api/v1/tickets",
            "jane@example.com",
            json!({
                "title": "VPN drops",
                "description": "Disconnects every hour",
                "priority": "high",
                "imageUrls": ["https://storage.example.com/vpn.png"]
            }),
        )
        .await;

    assert_status!(response, StatusCode::CREATED);
    assert!(response.body["id"].is_string());
    assert_eq!(response.body["published"], true);
    assert!(response.body["message_id"].is_string());
    assert_eq!(response.body["ticket"]["priority"], "High");
    assert_eq!(response.body["ticket"]["status"], "Queued");
    assert_eq!(
        response.body["ticket"]["submittedByEmail"],
        "jane@example.com"
    );

    let published = fixture.broker.published().await;
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].attributes["priority"], "high");
}

#[tokio::test]
async fn test_submit_without_email_is_unauthorized() {
    let fixture = TestFixture::new().await;

    let response = fixture
        .post("/api/v1/tickets", Some(json!({ "title": "No one" })))
        .await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert!(fixture.broker.published().await.is_empty());
}

#[tokio::test]
async fn test_submit_malformed_body_is_bad_request() {
    let fixture = TestFixture::new().await;

    let response = fixture
        .post_raw_as("/api/v1/tickets", "jane@example.com", "{not json")
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.body["error"].is_string());
}

#[tokio::test]
async fn test_submit_publish_failure_still_accepted() {
    let fixture = TestFixture::new().await;
    fixture
        .broker
        .fail_publish(BrokerError::ConnectionFailed("down".to_string()))
        .await;

    let response = fixture
        .post_as(
            "/api/v1/tickets",
            "jane@example.com",
            json!({ "title": "Lost" }),
        )
        .await;

    assert_status!(response, StatusCode::CREATED);
    assert_eq!(response.body["published"], false);
    assert!(response.body.get("message_id").is_none());
}

// =============================================================================
// Refresh and view
// =============================================================================

#[tokio::test]
async fn test_refresh_admits_and_lists_by_priority() {
    let fixture = TestFixture::with_config(TestConfig {
        capitalize_priority: true,
        ..TestConfig::default()
    })
    .await;

    for (title, priority) in [("a", "low"), ("b", "high"), ("c", "medium")] {
        let response = fixture
            .post_as(
                "/api/v1/tickets",
                "jane@example.com",
                json!({ "title": title, "priority": priority }),
            )
            .await;
        assert_status!(response, StatusCode::CREATED);
    }

    let response = fixture.post("/api/v1/tickets/refresh", None).await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["admitted"].as_array().unwrap().len(), 3);
    assert_eq!(response.body["admitted"][0]["title"], "b");
    assert_eq!(response.body["drain"]["received"], 3);
    assert_eq!(fixture.notifier.attempts().await.len(), 3);

    let response = fixture.get("/api/v1/tickets").await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["count"], 3);
    let titles: Vec<&str> = response.body["tickets"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["b", "c", "a"]);

    // A second refresh finds nothing new
    let response = fixture.post("/api/v1/tickets/refresh", None).await;
    assert_status!(response, StatusCode::OK);
    assert!(response.body["admitted"].as_array().unwrap().is_empty());
    assert_eq!(fixture.cache.recorded_sets().await.len(), 1);
}

#[tokio::test]
async fn test_refresh_broker_failure_is_bad_gateway() {
    let fixture = TestFixture::new().await;
    fixture
        .broker
        .fail_sessions(BrokerError::ConnectionFailed("unreachable".to_string()))
        .await;

    let response = fixture.post("/api/v1/tickets/refresh", None).await;

    assert_eq!(response.status, StatusCode::BAD_GATEWAY);
    assert!(response.body["error"].is_string());
}

#[tokio::test]
async fn test_inspect_does_not_consume() {
    let fixture = TestFixture::new().await;
    let ticket = fixtures::ticket("Peek", TicketPriority::Low);
    fixture
        .broker
        .publish(fixtures::ticket_message(&ticket, Some("Low")))
        .await
        .unwrap();

    let response = fixture
        .post("/api/v1/tickets/inspect?window_ms=100", None)
        .await;

    assert_status!(response, StatusCode::OK);
    assert!(response.body["stats"]["nacked"].as_u64().unwrap() >= 1);
    assert_eq!(response.body["stats"]["acked"], 0);
    assert_eq!(response.body["tickets"][0]["id"], ticket.id.as_str());
    assert!(fixture.cache.recorded_sets().await.is_empty());
    assert_eq!(fixture.broker.queue().pending_count().await, 1);
}

#[tokio::test]
async fn test_get_ticket() {
    let fixture = TestFixture::new().await;
    fixture
        .seed_open_tickets(&[fixtures::open_ticket("t-1", "Printer", TicketPriority::Low)])
        .await;

    let response = fixture.get("/api/v1/tickets/t-1").await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["title"], "Printer");
    assert_eq!(response.body["status"], "Open");

    let response = fixture.get("/api/v1/tickets/missing").await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_cache_failure_is_bad_gateway() {
    let fixture = TestFixture::new().await;
    fixture
        .cache
        .fail_next_get(CacheError::Unavailable("down".to_string()))
        .await;

    let response = fixture.get("/api/v1/tickets").await;

    assert_eq!(response.status, StatusCode::BAD_GATEWAY);
}

// =============================================================================
// Close and archive
// =============================================================================

#[tokio::test]
async fn test_close_ticket_archives_it() {
    let fixture = TestFixture::new().await;
    let x = fixtures::open_ticket("X", "keep", TicketPriority::Medium);
    let y = fixtures::open_ticket("Y", "close", TicketPriority::High);
    fixture.seed_open_tickets(&[x, y.clone()]).await;

    let response = fixture.post("/api/v1/tickets/Y/close", None).await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["id"], "Y");
    assert_eq!(response.body["status"], "Closed");

    let response = fixture.get("/api/v1/tickets").await;
    assert_eq!(response.body["count"], 1);
    assert_eq!(response.body["tickets"][0]["id"], "X");

    let owner = y.submitted_by_email.as_str();
    let response = fixture.get_as("/api/v1/archive/Y", owner).await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["status"], "Closed");

    let response = fixture.get_as("/api/v1/archive", owner).await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["email"], owner);
    assert_eq!(response.body["tickets"].as_array().unwrap().len(), 1);

    let archived = fixture
        .archive
        .get(&y.submitted_by_email, "Y")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(archived.status, TicketStatus::Closed);
}

#[tokio::test]
async fn test_close_unknown_ticket_is_not_found() {
    let fixture = TestFixture::new().await;
    fixture
        .seed_open_tickets(&[fixtures::open_ticket("X", "keep", TicketPriority::Medium)])
        .await;

    let response = fixture.post("/api/v1/tickets/Z/close", None).await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert!(fixture.cache.recorded_sets().await.is_empty());
    assert_eq!(fixture.archive.put_count().await, 0);
}

#[tokio::test]
async fn test_close_archive_failure_is_bad_gateway() {
    let fixture = TestFixture::new().await;
    fixture
        .seed_open_tickets(&[fixtures::open_ticket("Y", "close", TicketPriority::High)])
        .await;
    fixture
        .archive
        .fail_puts(ArchiveError::Unavailable("down".to_string()))
        .await;

    let response = fixture.post("/api/v1/tickets/Y/close", None).await;
    assert_eq!(response.status, StatusCode::BAD_GATEWAY);

    // The ticket has already left the cache
    let response = fixture.get("/api/v1/tickets").await;
    assert_eq!(response.body["count"], 0);
}

#[tokio::test]
async fn test_archived_ticket_not_found() {
    let fixture = TestFixture::new().await;

    let response = fixture
        .get_as("/api/v1/archive/nope", "jane@example.com")
        .await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_archive_requires_caller_email() {
    let fixture = TestFixture::new().await;
    let y = fixtures::open_ticket("Y", "secret", TicketPriority::High);
    fixture.seed_open_tickets(&[y]).await;
    let response = fixture.post("/api/v1/tickets/Y/close", None).await;
    assert_status!(response, StatusCode::OK);

    let response = fixture.get("/api/v1/archive").await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert!(response.body.get("tickets").is_none());

    let response = fixture.get("/api/v1/archive/Y").await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_archive_is_scoped_to_caller() {
    let fixture = TestFixture::new().await;
    let y = fixtures::open_ticket("Y", "secret", TicketPriority::High);
    let owner = y.submitted_by_email.clone();
    fixture.seed_open_tickets(&[y]).await;
    let response = fixture.post("/api/v1/tickets/Y/close", None).await;
    assert_status!(response, StatusCode::OK);

    let response = fixture
        .get_as("/api/v1/archive", "mallory@example.com")
        .await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["email"], "mallory@example.com");
    assert!(response.body["tickets"].as_array().unwrap().is_empty());

    let response = fixture
        .get_as("/api/v1/archive/Y", "mallory@example.com")
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    let response = fixture.get_as("/api/v1/archive/Y", &owner).await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["title"], "secret");
}

// =============================================================================
// Ingest loop
// =============================================================================

#[tokio::test]
async fn test_ingest_start_stop() {
    let fixture = TestFixture::new().await;

    let response = fixture.get("/api/v1/ingest/status").await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["running"], false);

    let response = fixture.post("/api/v1/ingest/start", None).await;
    assert_eq!(response.body["message"], "Ingest loop started");
    let response = fixture.post("/api/v1/ingest/start", None).await;
    assert_eq!(response.body["message"], "Ingest loop already running");

    let response = fixture.get("/api/v1/ingest/status").await;
    assert_eq!(response.body["running"], true);

    let response = fixture.post("/api/v1/ingest/stop", None).await;
    assert_eq!(response.body["message"], "Ingest loop stopped");
    let response = fixture.post("/api/v1/ingest/stop", None).await;
    assert_eq!(response.body["message"], "Ingest loop not running");

    assert!(!fixture.ingest.status().await.running);
}
