//! Registration admission.
//!
//! [`AdmissionService`] coordinates the durable registry, the quota ledger
//! and the token issuer for one registration attempt at a time. Any number of
//! attempts may run concurrently for the same ticket; the only ordering point
//! between them is the ledger's atomic reservation.

mod error;
mod saga;
mod service;
mod types;

pub use error::AdmissionError;
pub use saga::{AdmissionSaga, Compensation, UnwindReport};
pub use service::AdmissionService;
pub use types::{Admission, TicketChanges, TicketDraft};
