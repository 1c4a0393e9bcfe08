//! Per-ticket remaining-slots counter.

mod ledger;

pub use ledger::{QuotaError, QuotaLedger, Reservation};
