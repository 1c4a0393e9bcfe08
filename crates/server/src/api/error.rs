//! Maps admission outcomes to HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use ticketgate_core::AdmissionError;

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
}

/// Wrapper so handlers can return `Result<_, ApiError>` and use `?`.
#[derive(Debug)]
pub struct ApiError(pub AdmissionError);

impl From<AdmissionError> for ApiError {
    fn from(e: AdmissionError) -> Self {
        Self(e)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self.0 {
            AdmissionError::StateRequired | AdmissionError::InvalidRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            AdmissionError::InvalidState => StatusCode::FORBIDDEN,
            AdmissionError::QuotaExhausted | AdmissionError::AlreadyRegistered => {
                StatusCode::CONFLICT
            }
            AdmissionError::TicketNotFound | AdmissionError::RegistrantNotFound => {
                StatusCode::NOT_FOUND
            }
            AdmissionError::PersistenceFailed => StatusCode::INTERNAL_SERVER_ERROR,
            AdmissionError::StoreUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: self.0.to_string(),
            code: self.0.label(),
        };
        (self.status(), Json(body)).into_response()
    }
}
