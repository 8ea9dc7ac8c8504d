//! Archive API handlers (read-only access to the caller's closed tickets).

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use ticketline_core::Ticket;

use super::handlers::{error_response, ErrorResponse};
use super::middleware::AuthUser;
use crate::state::AppState;

/// Response for listing a user's archive
#[derive(Debug, Serialize)]
pub struct ListArchiveResponse {
    pub email: String,
    pub tickets: Vec<Ticket>,
}

/// The archive partition is the caller's own email.
fn caller_email(user: &AuthUser) -> Result<String, (StatusCode, Json<ErrorResponse>)> {
    user.email().map(str::to_string).ok_or_else(|| {
        error_response(
            StatusCode::UNAUTHORIZED,
            "A user email is required (X-User-Email header)",
        )
    })
}

/// Get one of the caller's archived tickets
pub async fn get_archived_ticket(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Ticket>, (StatusCode, Json<ErrorResponse>)> {
    let email = caller_email(&user)?;

    match state.pipeline().archived_ticket(&email, &id).await {
        Ok(Some(ticket)) => Ok(Json(ticket)),
        Ok(None) => Err(error_response(
            StatusCode::NOT_FOUND,
            format!("Archived ticket not found: {}", id),
        )),
        Err(e) => Err(error_response(StatusCode::BAD_GATEWAY, e.to_string())),
    }
}

/// List every archived ticket of the caller, oldest first
pub async fn list_archived_tickets(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<Json<ListArchiveResponse>, (StatusCode, Json<ErrorResponse>)> {
    let email = caller_email(&user)?;

    let tickets = state
        .pipeline()
        .archived_tickets(&email)
        .await
        .map_err(|e| error_response(StatusCode::BAD_GATEWAY, e.to_string()))?;

    Ok(Json(ListArchiveResponse { email, tickets }))
}
