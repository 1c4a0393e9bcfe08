//! Registration handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use ticketgate_core::{Admission, Registrant, RegistrantPage};

use super::error::ApiError;
use super::middleware::AuthUser;
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Query parameters for creating a registration
#[derive(Debug, Deserialize)]
pub struct CreateRegistrationParams {
    /// Gate token, required for private tickets
    pub state: Option<String>,
}

/// Query parameters for listing a ticket's registrants
#[derive(Debug, Deserialize)]
pub struct ListRegistrantsParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub search: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RegistrationsResponse {
    pub data: Vec<Registrant>,
}

/// Gate token response; `state` is null for public tickets.
#[derive(Debug, Serialize)]
pub struct GateTokenResponse {
    pub state: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub id: String,
    pub ticket_id: String,
    pub is_verified: bool,
}

// ============================================================================
// Handlers
// ============================================================================

/// Registrations held by the caller
pub async fn list_my_registrations(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<RegistrationsResponse>, ApiError> {
    let data = state.admission().registrations_for_user(user_id).await?;
    Ok(Json(RegistrationsResponse { data }))
}

/// Registrants of a ticket owned by the caller
pub async fn list_ticket_registrants(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Path(ticket_id): Path<String>,
    Query(params): Query<ListRegistrantsParams>,
) -> Result<Json<RegistrantPage>, ApiError> {
    let page = state
        .admission()
        .registrants_for_ticket(
            &ticket_id,
            user_id,
            params.page,
            params.limit,
            params.search.as_deref(),
        )
        .await?;
    Ok(Json(page))
}

/// Register the caller for a ticket
pub async fn create_registration(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Path(ticket_id): Path<String>,
    Query(params): Query<CreateRegistrationParams>,
) -> Result<(StatusCode, Json<Admission>), ApiError> {
    let admission = state
        .admission()
        .create_registration(&ticket_id, user_id, params.state.as_deref())
        .await?;
    Ok((StatusCode::CREATED, Json(admission)))
}

/// Hand out the caller's gate token for a ticket
pub async fn generate_gate_token(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Path(ticket_id): Path<String>,
) -> Result<Json<GateTokenResponse>, ApiError> {
    let token = state
        .admission()
        .generate_gate_token(&ticket_id, user_id)
        .await?;
    Ok(Json(GateTokenResponse { state: token }))
}

/// Mark a registrant of the caller's ticket as verified
pub async fn verify_registrant(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Path((id, ticket_id)): Path<(String, String)>,
) -> Result<Json<VerifyResponse>, ApiError> {
    state
        .admission()
        .verify_registrant(&id, &ticket_id, user_id)
        .await?;
    Ok(Json(VerifyResponse {
        id,
        ticket_id,
        is_verified: true,
    }))
}
