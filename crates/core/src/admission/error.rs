use thiserror::Error;

/// Why a registration attempt (or a related call) did not succeed.
///
/// Messages never carry store internals; details are logged where the fault
/// is observed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdmissionError {
    #[error("State is required for private tickets")]
    StateRequired,

    #[error("Invalid or expired state")]
    InvalidState,

    #[error("Ticket quota exhausted")]
    QuotaExhausted,

    #[error("Already registered for this ticket")]
    AlreadyRegistered,

    #[error("Ticket not found")]
    TicketNotFound,

    #[error("Registrant not found")]
    RegistrantNotFound,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Failed to persist registration")]
    PersistenceFailed,

    #[error("Quota store unavailable")]
    StoreUnavailable,
}

impl AdmissionError {
    /// Expected outcomes that are reported to the caller as-is and are not
    /// logged as errors.
    pub fn is_business_outcome(&self) -> bool {
        !matches!(
            self,
            AdmissionError::PersistenceFailed | AdmissionError::StoreUnavailable
        )
    }

    /// Metric label for this outcome.
    pub fn label(&self) -> &'static str {
        match self {
            AdmissionError::StateRequired => "state_required",
            AdmissionError::InvalidState => "invalid_state",
            AdmissionError::QuotaExhausted => "quota_exhausted",
            AdmissionError::AlreadyRegistered => "already_registered",
            AdmissionError::TicketNotFound => "ticket_not_found",
            AdmissionError::RegistrantNotFound => "registrant_not_found",
            AdmissionError::InvalidRequest(_) => "invalid_request",
            AdmissionError::PersistenceFailed => "persistence_failed",
            AdmissionError::StoreUnavailable => "store_unavailable",
        }
    }
}
