//! Ticket API handlers.

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use ticketline_core::{
    pipeline::DrainStats, CloseOutcome, NewTicket, PipelineError, RefreshReport, SubmitError,
    Ticket,
};
use tracing::warn;

use super::handlers::{error_response, ErrorResponse};
use super::middleware::AuthUser;
use crate::state::AppState;

/// Longest window an inspection drain may request.
const MAX_INSPECT_WINDOW_MS: u64 = 30_000;

type ApiError = (StatusCode, Json<ErrorResponse>);

// ============================================================================
// Request/Response Types
// ============================================================================

/// Response for a submission
#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub id: String,
    /// False when the broker rejected the publish; the ticket was still accepted.
    pub published: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    pub ticket: Ticket,
}

/// Response for listing open tickets
#[derive(Debug, Serialize)]
pub struct ListTicketsResponse {
    pub tickets: Vec<Ticket>,
    pub count: usize,
}

/// Query parameters for an inspection drain
#[derive(Debug, Deserialize)]
pub struct InspectParams {
    /// Drain window in milliseconds (defaults to the configured window)
    pub window_ms: Option<u64>,
}

/// Response for an inspection drain
#[derive(Debug, Serialize)]
pub struct InspectResponse {
    pub tickets: Vec<Ticket>,
    pub stats: DrainStats,
}

/// Map a pipeline failure to an HTTP error.
///
/// Every variant is a transport failure against the broker, cache or
/// archive, so they all surface as 502.
fn pipeline_error(e: PipelineError) -> ApiError {
    warn!(error = %e, "Pipeline operation failed");
    error_response(StatusCode::BAD_GATEWAY, e.to_string())
}

// ============================================================================
// Handlers
// ============================================================================

/// Submit a new ticket on behalf of the authenticated user
pub async fn create_ticket(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    body: Result<Json<NewTicket>, JsonRejection>,
) -> Result<(StatusCode, Json<SubmitResponse>), ApiError> {
    let Json(request) =
        body.map_err(|e| error_response(StatusCode::BAD_REQUEST, e.body_text()))?;

    match state.pipeline().submit(user.email(), request).await {
        Ok(outcome) => Ok((
            StatusCode::CREATED,
            Json(SubmitResponse {
                id: outcome.ticket.id.clone(),
                published: outcome.published,
                message_id: outcome.message_id,
                ticket: outcome.ticket,
            }),
        )),
        Err(SubmitError::Unauthenticated) => Err(error_response(
            StatusCode::UNAUTHORIZED,
            "A submitter email is required (X-User-Email header)",
        )),
    }
}

/// List open tickets, highest priority first
pub async fn list_tickets(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ListTicketsResponse>, ApiError> {
    let tickets = state
        .pipeline()
        .open_tickets()
        .await
        .map_err(pipeline_error)?;

    Ok(Json(ListTicketsResponse {
        count: tickets.len(),
        tickets,
    }))
}

/// Get one open ticket by ID
pub async fn get_ticket(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Ticket>, ApiError> {
    match state.pipeline().open_ticket(&id).await {
        Ok(Some(ticket)) => Ok(Json(ticket)),
        Ok(None) => Err(error_response(
            StatusCode::NOT_FOUND,
            format!("Ticket not found: {}", id),
        )),
        Err(e) => Err(pipeline_error(e)),
    }
}

/// Drain the queue for the configured window and admit new tickets
pub async fn refresh_tickets(
    State(state): State<Arc<AppState>>,
) -> Result<Json<RefreshReport>, ApiError> {
    state
        .pipeline()
        .refresh(None)
        .await
        .map(Json)
        .map_err(pipeline_error)
}

/// Drain without acknowledging anything and return what was seen.
///
/// Every message is nacked, so the broker redelivers it; a message may appear
/// more than once within one window.
pub async fn inspect_queue(
    State(state): State<Arc<AppState>>,
    Query(params): Query<InspectParams>,
) -> Result<Json<InspectResponse>, ApiError> {
    let window = match params.window_ms {
        Some(ms) => Duration::from_millis(ms.clamp(1, MAX_INSPECT_WINDOW_MS)),
        None => state.pipeline().drain_window(),
    };

    let batch = state
        .pipeline()
        .drain(window, false, None)
        .await
        .map_err(pipeline_error)?;

    Ok(Json(InspectResponse {
        tickets: batch.tickets,
        stats: batch.stats,
    }))
}

/// Close an open ticket and archive it
pub async fn close_ticket(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Ticket>, ApiError> {
    match state.pipeline().close(&id).await {
        Ok(CloseOutcome::Closed(ticket)) => Ok(Json(ticket)),
        Ok(CloseOutcome::NotFound) => Err(error_response(
            StatusCode::NOT_FOUND,
            format!("Ticket not found: {}", id),
        )),
        Err(e) => Err(pipeline_error(e)),
    }
}
