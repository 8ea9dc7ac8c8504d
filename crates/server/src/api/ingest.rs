//! Ingest loop API handlers.

use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;
use ticketline_core::IngestStatus;

use crate::state::AppState;

/// Simple message response
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Get ingest loop status
pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<IngestStatus> {
    Json(state.ingest().status().await)
}

/// Start the ingest loop
pub async fn start(State(state): State<Arc<AppState>>) -> Json<MessageResponse> {
    let message = if state.ingest().start().await {
        "Ingest loop started"
    } else {
        "Ingest loop already running"
    };
    Json(MessageResponse {
        message: message.to_string(),
    })
}

/// Stop the ingest loop, waiting for an in-progress refresh to wind down
pub async fn stop(State(state): State<Arc<AppState>>) -> Json<MessageResponse> {
    let message = if state.ingest().stop().await {
        "Ingest loop stopped"
    } else {
        "Ingest loop not running"
    };
    Json(MessageResponse {
        message: message.to_string(),
    })
}
