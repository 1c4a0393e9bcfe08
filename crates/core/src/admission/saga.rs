use std::time::Duration;

use crate::quota::QuotaLedger;
use crate::registry::UserId;

/// Corrective action for a step that completed before the attempt failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Compensation {
    /// Return a slot taken by `QuotaLedger::reserve`.
    ReleaseSlot { ticket_id: String },
}

/// Compensations recorded by one registration attempt.
///
/// Steps push their compensation once they succeed. On failure the attempt
/// unwinds the record in reverse order; on success it is simply dropped.
#[derive(Debug)]
pub struct AdmissionSaga {
    ticket_id: String,
    user_id: UserId,
    compensations: Vec<Compensation>,
}

/// What happened while unwinding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnwindReport {
    pub slots_released: usize,
    pub errors: Vec<String>,
}

impl UnwindReport {
    pub fn success(&self) -> bool {
        self.errors.is_empty()
    }
}

impl AdmissionSaga {
    pub fn new(ticket_id: &str, user_id: UserId) -> Self {
        Self {
            ticket_id: ticket_id.to_string(),
            user_id,
            compensations: Vec::new(),
        }
    }

    pub fn record(&mut self, compensation: Compensation) {
        self.compensations.push(compensation);
    }

    pub fn pending(&self) -> &[Compensation] {
        &self.compensations
    }

    /// Runs recorded compensations newest first.
    ///
    /// Failures are logged and collected, never returned as errors. A slot
    /// that cannot be released stays lost until the counter expires and is
    /// rebuilt from durable state.
    pub async fn unwind(self, ledger: &QuotaLedger, call_timeout: Duration) -> UnwindReport {
        let mut report = UnwindReport::default();

        for compensation in self.compensations.into_iter().rev() {
            match compensation {
                Compensation::ReleaseSlot { ticket_id } => {
                    match tokio::time::timeout(call_timeout, ledger.release(&ticket_id)).await {
                        Ok(Ok(remaining)) => {
                            report.slots_released += 1;
                            tracing::debug!(
                                ticket_id = %ticket_id,
                                user_id = self.user_id,
                                remaining = ?remaining,
                                "Released reserved slot"
                            );
                        }
                        Ok(Err(e)) => {
                            tracing::error!(
                                ticket_id = %ticket_id,
                                user_id = self.user_id,
                                error = %e,
                                "Failed to release reserved slot"
                            );
                            report.errors.push(e.to_string());
                        }
                        Err(_) => {
                            tracing::error!(
                                ticket_id = %ticket_id,
                                user_id = self.user_id,
                                "Timed out releasing reserved slot"
                            );
                            report.errors.push("release timed out".to_string());
                        }
                    }
                }
            }
        }

        if !report.success() {
            tracing::warn!(
                ticket_id = %self.ticket_id,
                user_id = self.user_id,
                failures = report.errors.len(),
                "Compensation incomplete, counter heals on expiry"
            );
        }

        report
    }
}
