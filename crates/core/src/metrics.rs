//! Prometheus metrics for core components.
//!
//! The server registers everything returned by [`all_metrics`] on its own
//! registry next to the HTTP metrics.

use once_cell::sync::Lazy;
use prometheus::{IntCounterVec, Opts};

// =============================================================================
// Admission
// =============================================================================

/// Registration attempts by outcome.
pub static ADMISSION_ATTEMPTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "ticketgate_admission_attempts_total",
            "Total registration attempts",
        ),
        // "admitted", "state_required", "invalid_state", "quota_exhausted",
        // "already_registered", "persistence_failed", "store_unavailable",
        // "ticket_not_found"
        &["result"],
    )
    .expect("admission attempts metric")
});

// =============================================================================
// Quota counter
// =============================================================================

/// Slot reservations by result.
pub static RESERVATIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "ticketgate_quota_reservations_total",
            "Quota slot reservation attempts",
        ),
        &["result"], // "reserved", "exhausted", "error"
    )
    .expect("reservations metric")
});

/// Slot releases issued as compensation.
pub static COMPENSATIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "ticketgate_quota_compensations_total",
            "Quota slots returned after a failed registration",
        ),
        &["result"], // "released", "absent", "failed"
    )
    .expect("compensations metric")
});

// =============================================================================
// Tokens
// =============================================================================

pub static TOKENS_ISSUED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("ticketgate_tokens_issued_total", "Single-use tokens issued"),
        &["purpose"],
    )
    .expect("tokens issued metric")
});

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(ADMISSION_ATTEMPTS.clone()),
        Box::new(RESERVATIONS.clone()),
        Box::new(COMPENSATIONS.clone()),
        Box::new(TOKENS_ISSUED.clone()),
    ]
}
