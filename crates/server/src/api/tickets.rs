//! Ticket publishing handlers.
//!
//! Ticket metadata beyond quota and mode belongs to the ticket catalogue;
//! these endpoints exist so the counter is seeded and kept in step.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use ticketgate_core::{Ticket, TicketChanges, TicketDraft, TicketMode, UserId};

use super::error::ApiError;
use super::middleware::AuthUser;
use crate::state::AppState;

/// Response for ticket operations
#[derive(Debug, Serialize)]
pub struct TicketResponse {
    pub id: String,
    pub owner_id: UserId,
    pub title: String,
    pub quota: u32,
    pub registered_count: u32,
    pub mode: TicketMode,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Ticket> for TicketResponse {
    fn from(ticket: Ticket) -> Self {
        Self {
            id: ticket.id,
            owner_id: ticket.owner_id,
            title: ticket.title,
            quota: ticket.quota,
            registered_count: ticket.registered_count,
            mode: ticket.mode,
            created_at: ticket.created_at.to_rfc3339(),
            updated_at: ticket.updated_at.to_rfc3339(),
        }
    }
}

/// Publish a ticket owned by the caller
pub async fn publish_ticket(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<TicketDraft>,
) -> Result<(StatusCode, Json<TicketResponse>), ApiError> {
    let ticket = state.admission().publish_ticket(user_id, body).await?;
    Ok((StatusCode::CREATED, Json(TicketResponse::from(ticket))))
}

/// Change quota and mode of one of the caller's tickets
pub async fn update_ticket(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<String>,
    Json(body): Json<TicketChanges>,
) -> Result<Json<TicketResponse>, ApiError> {
    let ticket = state.admission().update_ticket(&id, user_id, body).await?;
    Ok(Json(TicketResponse::from(ticket)))
}

/// Withdraw one of the caller's tickets
pub async fn withdraw_ticket(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.admission().withdraw_ticket(&id, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
