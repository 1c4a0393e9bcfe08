use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::counter::{CounterError, CounterStore};
use crate::metrics::{COMPENSATIONS, RESERVATIONS};

#[derive(Debug, Error)]
pub enum QuotaError {
    #[error("Quota counter unavailable: {0}")]
    Store(#[from] CounterError),
}

impl QuotaError {
    /// True when the store may have applied the operation even though the
    /// caller saw a failure.
    pub fn is_uncertain(&self) -> bool {
        matches!(self, QuotaError::Store(CounterError::Timeout))
    }
}

/// Outcome of a reservation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reservation {
    /// A slot was taken; `remaining` is the counter after the decrement.
    Reserved { remaining: i64 },
    /// No slot left (or no counter). Expected, not an error.
    Exhausted,
}

impl Reservation {
    pub fn is_reserved(&self) -> bool {
        matches!(self, Reservation::Reserved { .. })
    }
}

/// Owns the lifecycle of each ticket's remaining-slots counter.
///
/// While a counter exists:
/// `value == quota - registered_count - reservations since initialization`.
/// Application code never reads-then-writes the value; every mutation is a
/// single store primitive.
#[derive(Clone)]
pub struct QuotaLedger {
    store: Arc<dyn CounterStore>,
    ttl: Duration,
}

impl QuotaLedger {
    pub fn new(store: Arc<dyn CounterStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    fn key(ticket_id: &str) -> String {
        format!("quota:{ticket_id}")
    }

    fn remaining_from(quota: u32, registered_count: u32) -> i64 {
        (i64::from(quota) - i64::from(registered_count)).max(0)
    }

    /// Creates the counter from durable state if it does not exist yet.
    ///
    /// An exhausted ticket still gets a counter of 0, so later reservations
    /// fail deterministically. Only the first of several concurrent
    /// initializers writes; a live counter is never overwritten, even one
    /// created a moment earlier and already decremented.
    pub async fn ensure_initialized(
        &self,
        ticket_id: &str,
        quota: u32,
        registered_count: u32,
    ) -> Result<(), QuotaError> {
        let remaining = Self::remaining_from(quota, registered_count);
        let created = self
            .store
            .set_if_absent(&Self::key(ticket_id), &remaining.to_string(), self.ttl)
            .await?;
        if created {
            tracing::debug!(ticket_id, remaining, "Initialized quota counter");
        }
        Ok(())
    }

    /// Overwrites the counter from durable state. Used when a ticket is
    /// published or its quota changes.
    pub async fn reset(
        &self,
        ticket_id: &str,
        quota: u32,
        registered_count: u32,
    ) -> Result<(), QuotaError> {
        let remaining = Self::remaining_from(quota, registered_count);
        self.store
            .set(&Self::key(ticket_id), &remaining.to_string(), self.ttl)
            .await?;
        tracing::debug!(ticket_id, remaining, "Reset quota counter");
        Ok(())
    }

    /// Drops the counter of a withdrawn ticket.
    pub async fn forget(&self, ticket_id: &str) -> Result<(), QuotaError> {
        self.store.delete(&Self::key(ticket_id)).await?;
        Ok(())
    }

    /// Takes one slot if any is left. This is the only gate protecting the
    /// quota.
    pub async fn reserve(&self, ticket_id: &str) -> Result<Reservation, QuotaError> {
        let outcome = match self.store.decrement_if_positive(&Self::key(ticket_id)).await {
            Ok(Some(remaining)) => Reservation::Reserved { remaining },
            Ok(None) => Reservation::Exhausted,
            Err(e) => {
                RESERVATIONS.with_label_values(&["error"]).inc();
                return Err(e.into());
            }
        };

        let label = if outcome.is_reserved() {
            "reserved"
        } else {
            "exhausted"
        };
        RESERVATIONS.with_label_values(&[label]).inc();

        Ok(outcome)
    }

    /// Returns a slot taken by `reserve`. Yields the counter after the
    /// increment, or `None` when the counter has expired or been dropped
    /// since; the next `ensure_initialized` rebuilds it from durable state,
    /// which already excludes the failed registration.
    ///
    /// Best effort: if this fails the slot stays lost until the counter
    /// expires and is rebuilt from the durable registered count.
    pub async fn release(&self, ticket_id: &str) -> Result<Option<i64>, QuotaError> {
        match self.store.increment_if_present(&Self::key(ticket_id)).await {
            Ok(remaining) => {
                let label = if remaining.is_some() { "released" } else { "absent" };
                COMPENSATIONS.with_label_values(&[label]).inc();
                Ok(remaining)
            }
            Err(e) => {
                COMPENSATIONS.with_label_values(&["failed"]).inc();
                Err(e.into())
            }
        }
    }

    /// Current counter value, `None` when uninitialized or expired.
    pub async fn remaining(&self, ticket_id: &str) -> Result<Option<i64>, QuotaError> {
        let key = Self::key(ticket_id);
        match self.store.get(&key).await? {
            Some(value) => value
                .parse::<i64>()
                .map(Some)
                .map_err(|_| CounterError::InvalidValue { key, value }.into()),
            None => Ok(None),
        }
    }
}
