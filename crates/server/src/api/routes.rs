use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::middleware::{auth_middleware, metrics_middleware};
use super::{archive, handlers, ingest, tickets};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // API routes
    let api_routes = Router::new()
        // Health and config
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        // Tickets
        .route("/tickets", post(tickets::create_ticket))
        .route("/tickets", get(tickets::list_tickets))
        .route("/tickets/refresh", post(tickets::refresh_tickets))
        .route("/tickets/inspect", post(tickets::inspect_queue))
        .route("/tickets/{id}", get(tickets::get_ticket))
        .route("/tickets/{id}/close", post(tickets::close_ticket))
        // Archive
        .route("/archive", get(archive::list_archived_tickets))
        .route("/archive/{id}", get(archive::get_archived_ticket))
        // Ingest loop
        .route("/ingest/status", get(ingest::get_status))
        .route("/ingest/start", post(ingest::start))
        .route("/ingest/stop", post(ingest::stop))
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            auth_middleware,
        ))
        .with_state(Arc::clone(&state));

    Router::new()
        .route("/metrics", get(handlers::metrics))
        .with_state(state)
        .nest("/api/v1", api_routes)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
}
