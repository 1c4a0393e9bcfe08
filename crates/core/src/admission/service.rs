use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::config::AdmissionConfig;
use crate::counter::CounterError;
use crate::metrics::ADMISSION_ATTEMPTS;
use crate::quota::{QuotaError, QuotaLedger, Reservation};
use crate::registry::{
    NewRegistrant, NewTicket, Registrant, RegistrantPage, RegistrantStore, RegistryError, Ticket,
    TicketStore, UserId,
};
use crate::token::{generate_token, TokenError, TokenIssuer, TokenPurpose};

use super::{Admission, AdmissionError, AdmissionSaga, Compensation, TicketChanges, TicketDraft};

const TICKET_ID_LENGTH: usize = 16;
const REGISTRANT_ID_LENGTH: usize = 6;
const DEFAULT_PAGE_LIMIT: u32 = 10;
const MAX_PAGE_LIMIT: u32 = 100;

/// Registration workflow and the ticket lifecycle hooks that keep the quota
/// counter in step with durable state.
///
/// All collaborators are injected; nothing here reaches for globals other
/// than metrics.
#[derive(Clone)]
pub struct AdmissionService {
    tickets: Arc<dyn TicketStore>,
    registrants: Arc<dyn RegistrantStore>,
    ledger: QuotaLedger,
    issuer: TokenIssuer,
    gate_token_ttl: Duration,
    call_timeout: Duration,
}

impl AdmissionService {
    pub fn new(
        tickets: Arc<dyn TicketStore>,
        registrants: Arc<dyn RegistrantStore>,
        ledger: QuotaLedger,
        issuer: TokenIssuer,
        config: &AdmissionConfig,
    ) -> Self {
        Self {
            tickets,
            registrants,
            ledger,
            issuer,
            gate_token_ttl: config.gate_token_ttl(),
            call_timeout: config.call_timeout(),
        }
    }

    pub fn ledger(&self) -> &QuotaLedger {
        &self.ledger
    }

    fn gate_subject(ticket_id: &str, user_id: UserId) -> String {
        format!("{ticket_id}:{user_id}")
    }

    /// Bounds a durable store call.
    async fn durable<T>(
        &self,
        op: &'static str,
        fut: impl Future<Output = Result<T, RegistryError>>,
    ) -> Result<T, RegistryError> {
        match tokio::time::timeout(self.call_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(RegistryError::Database(format!("{op} timed out"))),
        }
    }

    /// Bounds a counter store call. A timeout surfaces as
    /// `CounterError::Timeout`, which callers treat as uncertain.
    async fn counter<T, E: From<CounterError>>(
        &self,
        fut: impl Future<Output = Result<T, E>>,
    ) -> Result<T, E> {
        match tokio::time::timeout(self.call_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(CounterError::Timeout.into()),
        }
    }

    /// Attempts to register `user_id` for `ticket_id`.
    ///
    /// `state` is the gate token handed out by [`Self::generate_gate_token`];
    /// it is required for private tickets and ignored for public ones.
    pub async fn create_registration(
        &self,
        ticket_id: &str,
        user_id: UserId,
        state: Option<&str>,
    ) -> Result<Admission, AdmissionError> {
        let result = self.admit(ticket_id, user_id, state).await;

        match &result {
            Ok(admission) => {
                ADMISSION_ATTEMPTS.with_label_values(&["admitted"]).inc();
                tracing::info!(
                    ticket_id,
                    user_id,
                    registrant_id = %admission.registrant_id,
                    remaining = admission.remaining,
                    "Registration admitted"
                );
            }
            Err(e) => {
                ADMISSION_ATTEMPTS.with_label_values(&[e.label()]).inc();
                if e.is_business_outcome() {
                    tracing::debug!(ticket_id, user_id, reason = e.label(), "Registration rejected");
                } else {
                    tracing::error!(ticket_id, user_id, reason = e.label(), "Registration failed");
                }
            }
        }

        result
    }

    async fn admit(
        &self,
        ticket_id: &str,
        user_id: UserId,
        state: Option<&str>,
    ) -> Result<Admission, AdmissionError> {
        let ticket = self
            .durable("get ticket", self.tickets.get(ticket_id))
            .await
            .map_err(|e| registry_fault(ticket_id, user_id, "get ticket", e))?
            .ok_or(AdmissionError::TicketNotFound)?;

        let gated = ticket.mode.is_private();
        if gated {
            let state = state
                .filter(|s| !s.is_empty())
                .ok_or(AdmissionError::StateRequired)?;

            let subject = Self::gate_subject(ticket_id, user_id);
            self.counter(self.issuer.check_subject(
                &subject,
                TokenPurpose::RegistrationGate,
                state,
            ))
            .await
            .map_err(|e| match e {
                TokenError::NotFound | TokenError::Mismatch => AdmissionError::InvalidState,
                TokenError::StoreUnavailable(cause) => {
                    tracing::error!(ticket_id, user_id, error = %cause, "Gate token check failed");
                    AdmissionError::StoreUnavailable
                }
            })?;
        }

        // Cheap pre-check on durable state; the reservation below is the gate.
        if ticket.durable_remaining() <= 0 {
            return Err(AdmissionError::QuotaExhausted);
        }

        self.counter(self.ledger.ensure_initialized(
            ticket_id,
            ticket.quota,
            ticket.registered_count,
        ))
        .await
        .map_err(|e| quota_fault(ticket_id, user_id, "initialize quota", e))?;

        let remaining = match self.counter(self.ledger.reserve(ticket_id)).await {
            Ok(Reservation::Reserved { remaining }) => remaining,
            Ok(Reservation::Exhausted) => return Err(AdmissionError::QuotaExhausted),
            Err(e) => {
                if e.is_uncertain() {
                    // Releasing a slot that was never taken would oversell.
                    tracing::warn!(
                        ticket_id,
                        user_id,
                        "Reservation outcome unknown, not releasing"
                    );
                }
                return Err(quota_fault(ticket_id, user_id, "reserve slot", e));
            }
        };

        let mut saga = AdmissionSaga::new(ticket_id, user_id);
        saga.record(Compensation::ReleaseSlot {
            ticket_id: ticket_id.to_string(),
        });

        let registrant = NewRegistrant {
            id: generate_token(REGISTRANT_ID_LENGTH),
            user_id,
            ticket_id: ticket_id.to_string(),
            ticket_owner_id: ticket.owner_id,
        };
        let registrant = match self
            .durable("create registrant", self.registrants.create(registrant))
            .await
        {
            Ok(registrant) => registrant,
            Err(RegistryError::UniqueViolation) => {
                saga.unwind(&self.ledger, self.call_timeout).await;
                return Err(AdmissionError::AlreadyRegistered);
            }
            Err(e) => {
                saga.unwind(&self.ledger, self.call_timeout).await;
                return Err(registry_fault(ticket_id, user_id, "create registrant", e));
            }
        };

        if let Err(e) = self
            .durable(
                "increment registered count",
                self.tickets.increment_registered_count(ticket_id),
            )
            .await
        {
            // The registrant row stays; reconciling it is left to repair tooling.
            tracing::warn!(
                ticket_id,
                user_id,
                registrant_id = %registrant.id,
                "Registrant persisted without a registered count"
            );
            saga.unwind(&self.ledger, self.call_timeout).await;
            return Err(registry_fault(
                ticket_id,
                user_id,
                "increment registered count",
                e,
            ));
        }

        if gated {
            let subject = Self::gate_subject(ticket_id, user_id);
            if let Err(e) = self
                .counter(
                    self.issuer
                        .revoke_subject(&subject, TokenPurpose::RegistrationGate),
                )
                .await
            {
                tracing::warn!(ticket_id, user_id, error = %e, "Failed to revoke gate token");
            }
        }

        Ok(Admission {
            registrant_id: registrant.id,
            ticket_id: ticket_id.to_string(),
            user_id,
            remaining,
        })
    }

    /// Issues the gate token a user needs to register for a private ticket.
    ///
    /// Public tickets need no token and yield `None`.
    pub async fn generate_gate_token(
        &self,
        ticket_id: &str,
        user_id: UserId,
    ) -> Result<Option<String>, AdmissionError> {
        let mode = match self.durable("get ticket mode", self.tickets.mode(ticket_id)).await {
            Ok(mode) => mode,
            Err(RegistryError::NotFound(_)) => return Err(AdmissionError::TicketNotFound),
            Err(e) => return Err(registry_fault(ticket_id, user_id, "get ticket mode", e)),
        };

        if !mode.is_private() {
            return Ok(None);
        }

        let subject = Self::gate_subject(ticket_id, user_id);
        let token = self
            .counter(self.issuer.issue_for_subject(
                &subject,
                TokenPurpose::RegistrationGate,
                self.gate_token_ttl,
            ))
            .await
            .map_err(|e| {
                tracing::error!(ticket_id, user_id, error = %e, "Failed to issue gate token");
                AdmissionError::StoreUnavailable
            })?;

        Ok(Some(token))
    }

    /// Marks a registrant of a ticket owned by `owner_id` as verified.
    /// Verifying twice is fine.
    pub async fn verify_registrant(
        &self,
        registrant_id: &str,
        ticket_id: &str,
        owner_id: UserId,
    ) -> Result<(), AdmissionError> {
        let updated = self
            .durable(
                "verify registrant",
                self.registrants
                    .mark_verified(registrant_id, ticket_id, owner_id),
            )
            .await
            .map_err(|e| registry_fault(ticket_id, owner_id, "verify registrant", e))?;

        if !updated {
            return Err(AdmissionError::RegistrantNotFound);
        }

        tracing::info!(ticket_id, registrant_id, "Registrant verified");
        Ok(())
    }

    /// Registrations held by `user_id`.
    pub async fn registrations_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<Registrant>, AdmissionError> {
        self.durable("list registrations", self.registrants.list_by_user(user_id))
            .await
            .map_err(|e| registry_fault("-", user_id, "list registrations", e))
    }

    /// Registrants of a ticket, visible to its owner only.
    ///
    /// `page` starts at 1; `limit` defaults to 10 and is capped at 100.
    pub async fn registrants_for_ticket(
        &self,
        ticket_id: &str,
        owner_id: UserId,
        page: Option<u32>,
        limit: Option<u32>,
        search: Option<&str>,
    ) -> Result<RegistrantPage, AdmissionError> {
        let page = page.unwrap_or(1).max(1);
        let limit = limit.unwrap_or(DEFAULT_PAGE_LIMIT).clamp(1, MAX_PAGE_LIMIT);
        let search = search.map(str::trim).filter(|s| !s.is_empty());

        self.durable(
            "list registrants",
            self.registrants
                .list_by_ticket(ticket_id, owner_id, page, limit, search),
        )
        .await
        .map_err(|e| registry_fault(ticket_id, owner_id, "list registrants", e))
    }

    /// Publishes a ticket and seeds its quota counter.
    pub async fn publish_ticket(
        &self,
        owner_id: UserId,
        draft: TicketDraft,
    ) -> Result<Ticket, AdmissionError> {
        let title = draft.title.trim();
        if title.is_empty() {
            return Err(AdmissionError::InvalidRequest("title is required".to_string()));
        }
        if draft.quota == 0 {
            return Err(AdmissionError::InvalidRequest(
                "quota must be at least 1".to_string(),
            ));
        }

        let new_ticket = NewTicket {
            id: generate_token(TICKET_ID_LENGTH),
            owner_id,
            title: title.to_string(),
            quota: draft.quota,
            mode: draft.mode,
        };
        let ticket = self
            .durable("create ticket", self.tickets.create(new_ticket))
            .await
            .map_err(|e| registry_fault("-", owner_id, "create ticket", e))?;

        // A missing counter is rebuilt on the first registration.
        if let Err(e) = self
            .counter(self.ledger.reset(&ticket.id, ticket.quota, 0))
            .await
        {
            tracing::warn!(ticket_id = %ticket.id, error = %e, "Failed to seed quota counter");
        }

        tracing::info!(
            ticket_id = %ticket.id,
            owner_id,
            quota = ticket.quota,
            private = ticket.mode.is_private(),
            "Ticket published"
        );
        Ok(ticket)
    }

    /// Changes quota and mode, then resets the counter from the stored
    /// registered count.
    pub async fn update_ticket(
        &self,
        ticket_id: &str,
        owner_id: UserId,
        changes: TicketChanges,
    ) -> Result<Ticket, AdmissionError> {
        if changes.quota == 0 {
            return Err(AdmissionError::InvalidRequest(
                "quota must be at least 1".to_string(),
            ));
        }

        let ticket = match self
            .durable(
                "update ticket",
                self.tickets
                    .update_quota(ticket_id, owner_id, changes.quota, changes.mode),
            )
            .await
        {
            Ok(ticket) => ticket,
            Err(RegistryError::NotFound(_)) => return Err(AdmissionError::TicketNotFound),
            Err(e) => return Err(registry_fault(ticket_id, owner_id, "update ticket", e)),
        };

        // A stale counter could admit past a lowered quota, so this one is fatal.
        self.counter(
            self.ledger
                .reset(ticket_id, ticket.quota, ticket.registered_count),
        )
        .await
        .map_err(|e| quota_fault(ticket_id, owner_id, "reset quota", e))?;

        tracing::info!(ticket_id, owner_id, quota = ticket.quota, "Ticket updated");
        Ok(ticket)
    }

    /// Deletes a ticket with its registrants and drops its counter.
    pub async fn withdraw_ticket(
        &self,
        ticket_id: &str,
        owner_id: UserId,
    ) -> Result<(), AdmissionError> {
        match self
            .durable("delete ticket", self.tickets.delete(ticket_id, owner_id))
            .await
        {
            Ok(()) => {}
            Err(RegistryError::NotFound(_)) => return Err(AdmissionError::TicketNotFound),
            Err(e) => return Err(registry_fault(ticket_id, owner_id, "delete ticket", e)),
        }

        if let Err(e) = self.counter(self.ledger.forget(ticket_id)).await {
            tracing::warn!(ticket_id, error = %e, "Failed to drop quota counter");
        }

        tracing::info!(ticket_id, owner_id, "Ticket withdrawn");
        Ok(())
    }
}

fn registry_fault(ticket_id: &str, user_id: UserId, op: &str, e: RegistryError) -> AdmissionError {
    tracing::error!(ticket_id, user_id, op, error = %e, "Durable store call failed");
    AdmissionError::PersistenceFailed
}

fn quota_fault(ticket_id: &str, user_id: UserId, op: &str, e: QuotaError) -> AdmissionError {
    tracing::error!(ticket_id, user_id, op, error = %e, "Quota store call failed");
    AdmissionError::StoreUnavailable
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::counter::{CounterStore, MemoryCounterStore};
    use crate::registry::TicketMode;
    use crate::testing::{FailingOp, FlakyCounterStore, MockRegistry};

    struct Harness {
        service: AdmissionService,
        registry: Arc<MockRegistry>,
    }

    fn harness_with_store(store: Arc<dyn CounterStore>) -> Harness {
        let config = AdmissionConfig::default();
        let registry = Arc::new(MockRegistry::new());
        let service = AdmissionService::new(
            registry.clone(),
            registry.clone(),
            QuotaLedger::new(store.clone(), config.quota_ttl()),
            TokenIssuer::new(store, config.token_length),
            &config,
        );
        Harness { service, registry }
    }

    fn harness() -> Harness {
        harness_with_store(Arc::new(MemoryCounterStore::new()))
    }

    #[tokio::test]
    async fn test_public_registration_admits_and_counts() {
        let h = harness();
        h.registry.insert_ticket("t1", 1, 3, 0, TicketMode::Public);

        let admission = h.service.create_registration("t1", 7, None).await.unwrap();
        assert_eq!(admission.ticket_id, "t1");
        assert_eq!(admission.user_id, 7);
        assert_eq!(admission.remaining, 2);
        assert_eq!(admission.registrant_id.len(), 6);

        assert_eq!(h.registry.registered_count("t1"), Some(1));
        assert_eq!(h.registry.registrant_count(), 1);
        assert_eq!(h.service.ledger().remaining("t1").await.unwrap(), Some(2));
    }

    #[tokio::test]
    async fn test_registrant_id_length_independent_of_token_length() {
        let config = AdmissionConfig {
            token_length: 32,
            ..AdmissionConfig::default()
        };
        let store: Arc<dyn CounterStore> = Arc::new(MemoryCounterStore::new());
        let registry = Arc::new(MockRegistry::new());
        let service = AdmissionService::new(
            registry.clone(),
            registry.clone(),
            QuotaLedger::new(store.clone(), config.quota_ttl()),
            TokenIssuer::new(store, config.token_length),
            &config,
        );
        registry.insert_ticket("t1", 1, 3, 0, TicketMode::Private);

        let token = service.generate_gate_token("t1", 7).await.unwrap().unwrap();
        assert_eq!(token.len(), 32);

        let admission = service.create_registration("t1", 7, Some(&token)).await.unwrap();
        assert_eq!(admission.registrant_id.len(), REGISTRANT_ID_LENGTH);
    }

    #[tokio::test]
    async fn test_unknown_ticket() {
        let h = harness();
        let result = h.service.create_registration("missing", 7, None).await;
        assert_eq!(result, Err(AdmissionError::TicketNotFound));
    }

    #[tokio::test]
    async fn test_second_registration_is_already_registered_and_releases() {
        let h = harness();
        h.registry.insert_ticket("t1", 1, 3, 0, TicketMode::Public);

        h.service.create_registration("t1", 7, None).await.unwrap();
        let again = h.service.create_registration("t1", 7, None).await;

        assert_eq!(again, Err(AdmissionError::AlreadyRegistered));
        assert_eq!(h.service.ledger().remaining("t1").await.unwrap(), Some(2));
        assert_eq!(h.registry.registered_count("t1"), Some(1));
    }

    #[tokio::test]
    async fn test_persistence_failure_returns_slot() {
        let h = harness();
        h.registry.insert_ticket("t1", 1, 1, 0, TicketMode::Public);
        h.registry.fail_next_registrant_create();

        let failed = h.service.create_registration("t1", 7, None).await;
        assert_eq!(failed, Err(AdmissionError::PersistenceFailed));
        assert_eq!(h.service.ledger().remaining("t1").await.unwrap(), Some(1));

        // The released slot is available to the next caller.
        let admitted = h.service.create_registration("t1", 8, None).await.unwrap();
        assert_eq!(admitted.remaining, 0);
    }

    #[tokio::test]
    async fn test_count_increment_failure_returns_slot_and_keeps_row() {
        let h = harness();
        h.registry.insert_ticket("t1", 1, 2, 0, TicketMode::Public);
        h.registry.fail_next_increment();

        let failed = h.service.create_registration("t1", 7, None).await;
        assert_eq!(failed, Err(AdmissionError::PersistenceFailed));
        assert_eq!(h.service.ledger().remaining("t1").await.unwrap(), Some(2));
        assert_eq!(h.registry.registrant_count(), 1);
        assert_eq!(h.registry.registered_count("t1"), Some(0));
    }

    #[tokio::test]
    async fn test_exhausted_durable_state_short_circuits() {
        let h = harness();
        h.registry.insert_ticket("t1", 1, 5, 5, TicketMode::Public);

        let result = h.service.create_registration("t1", 7, None).await;
        assert_eq!(result, Err(AdmissionError::QuotaExhausted));
        assert_eq!(h.registry.durable_writes(), 0);
    }

    #[tokio::test]
    async fn test_exhausted_counter_rejects_without_durable_write() {
        let h = harness();
        h.registry.insert_ticket("t1", 1, 5, 0, TicketMode::Public);
        h.service.ledger().reset("t1", 5, 5).await.unwrap();

        let result = h.service.create_registration("t1", 7, None).await;
        assert_eq!(result, Err(AdmissionError::QuotaExhausted));
        assert_eq!(h.registry.durable_writes(), 0);
        assert_eq!(h.service.ledger().remaining("t1").await.unwrap(), Some(0));
    }

    #[tokio::test]
    async fn test_generate_gate_token_public_is_none() {
        let h = harness();
        h.registry.insert_ticket("t1", 1, 3, 0, TicketMode::Public);
        assert_eq!(h.service.generate_gate_token("t1", 7).await.unwrap(), None);
        assert_eq!(
            h.service.generate_gate_token("missing", 7).await,
            Err(AdmissionError::TicketNotFound)
        );
    }

    #[tokio::test]
    async fn test_private_ticket_requires_state() {
        let h = harness();
        h.registry.insert_ticket("t1", 1, 3, 0, TicketMode::Private);

        assert_eq!(
            h.service.create_registration("t1", 7, None).await,
            Err(AdmissionError::StateRequired)
        );
        assert_eq!(
            h.service.create_registration("t1", 7, Some("")).await,
            Err(AdmissionError::StateRequired)
        );
        // No reservation and no counter created.
        assert_eq!(h.service.ledger().remaining("t1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_private_ticket_without_token_makes_no_reservation() {
        let h = harness();
        h.registry.insert_ticket("t1", 1, 3, 0, TicketMode::Private);
        h.service.ledger().ensure_initialized("t1", 3, 0).await.unwrap();

        let result = h.service.create_registration("t1", 7, Some("abcdef")).await;
        assert_eq!(result, Err(AdmissionError::InvalidState));
        assert_eq!(h.service.ledger().remaining("t1").await.unwrap(), Some(3));
    }

    #[tokio::test]
    async fn test_private_ticket_mismatched_state_makes_no_reservation() {
        let h = harness();
        h.registry.insert_ticket("t1", 1, 3, 0, TicketMode::Private);
        h.service.ledger().ensure_initialized("t1", 3, 0).await.unwrap();

        let token = h.service.generate_gate_token("t1", 7).await.unwrap().unwrap();
        let wrong = if token == "000000" { "111111" } else { "000000" };

        let result = h.service.create_registration("t1", 7, Some(wrong)).await;
        assert_eq!(result, Err(AdmissionError::InvalidState));
        assert_eq!(h.service.ledger().remaining("t1").await.unwrap(), Some(3));

        // The real token is still usable after a mismatch.
        h.service
            .create_registration("t1", 7, Some(&token))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_private_token_is_single_use() {
        let h = harness();
        h.registry.insert_ticket("t1", 1, 3, 0, TicketMode::Private);

        let token = h.service.generate_gate_token("t1", 7).await.unwrap().unwrap();
        h.service
            .create_registration("t1", 7, Some(&token))
            .await
            .unwrap();

        let again = h.service.create_registration("t1", 7, Some(&token)).await;
        assert_eq!(again, Err(AdmissionError::InvalidState));
    }

    #[tokio::test]
    async fn test_token_bound_to_user() {
        let h = harness();
        h.registry.insert_ticket("t1", 1, 3, 0, TicketMode::Private);

        let token = h.service.generate_gate_token("t1", 7).await.unwrap().unwrap();
        let stolen = h.service.create_registration("t1", 8, Some(&token)).await;
        assert_eq!(stolen, Err(AdmissionError::InvalidState));
    }

    #[tokio::test]
    async fn test_counter_outage_is_store_unavailable() {
        let store = Arc::new(FlakyCounterStore::new(MemoryCounterStore::new()));
        let h = harness_with_store(store.clone());
        h.registry.insert_ticket("t1", 1, 3, 0, TicketMode::Public);
        store.fail(FailingOp::DecrementIfPositive);

        let result = h.service.create_registration("t1", 7, None).await;
        assert_eq!(result, Err(AdmissionError::StoreUnavailable));
        assert_eq!(h.registry.durable_writes(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_uncertain_reserve_timeout_does_not_release() {
        let store = Arc::new(FlakyCounterStore::new(MemoryCounterStore::new()));
        let h = harness_with_store(store.clone());
        h.registry.insert_ticket("t1", 1, 3, 0, TicketMode::Public);
        store.stall_after(FailingOp::DecrementIfPositive);

        let result = h.service.create_registration("t1", 7, None).await;
        assert_eq!(result, Err(AdmissionError::StoreUnavailable));

        // The decrement landed; the slot is under-sold rather than double-counted.
        store.heal();
        assert_eq!(h.service.ledger().remaining("t1").await.unwrap(), Some(2));
        assert_eq!(h.registry.registrant_count(), 0);
    }

    #[tokio::test]
    async fn test_verify_registrant() {
        let h = harness();
        h.registry.insert_ticket("t1", 1, 3, 0, TicketMode::Public);
        let admission = h.service.create_registration("t1", 7, None).await.unwrap();

        assert_eq!(
            h.service
                .verify_registrant(&admission.registrant_id, "t1", 2)
                .await,
            Err(AdmissionError::RegistrantNotFound)
        );
        h.service
            .verify_registrant(&admission.registrant_id, "t1", 1)
            .await
            .unwrap();
        h.service
            .verify_registrant(&admission.registrant_id, "t1", 1)
            .await
            .unwrap();

        let mine = h.service.registrations_for_user(7).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert!(mine[0].is_verified);
    }

    #[tokio::test]
    async fn test_registrants_for_ticket_clamps_paging() {
        let h = harness();
        h.registry.insert_ticket("t1", 1, 300, 0, TicketMode::Public);
        for user in 0..12 {
            h.service.create_registration("t1", user, None).await.unwrap();
        }

        let page = h
            .service
            .registrants_for_ticket("t1", 1, None, None, None)
            .await
            .unwrap();
        assert_eq!(page.page, 1);
        assert_eq!(page.limit, 10);
        assert_eq!(page.total, 12);
        assert_eq!(page.data.len(), 10);

        let page = h
            .service
            .registrants_for_ticket("t1", 1, Some(0), Some(500), Some("  "))
            .await
            .unwrap();
        assert_eq!(page.page, 1);
        assert_eq!(page.limit, 100);
        assert_eq!(page.data.len(), 12);
    }

    #[tokio::test]
    async fn test_publish_update_withdraw_keep_counter_in_step() {
        let h = harness();

        let ticket = h
            .service
            .publish_ticket(
                1,
                TicketDraft {
                    title: "  Launch party ".to_string(),
                    quota: 2,
                    mode: TicketMode::Public,
                },
            )
            .await
            .unwrap();
        assert_eq!(ticket.title, "Launch party");
        assert_eq!(ticket.id.len(), TICKET_ID_LENGTH);
        assert_eq!(h.service.ledger().remaining(&ticket.id).await.unwrap(), Some(2));

        h.service.create_registration(&ticket.id, 7, None).await.unwrap();

        let updated = h
            .service
            .update_ticket(
                &ticket.id,
                1,
                TicketChanges {
                    quota: 5,
                    mode: TicketMode::Private,
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.registered_count, 1);
        assert_eq!(h.service.ledger().remaining(&ticket.id).await.unwrap(), Some(4));

        assert_eq!(
            h.service
                .update_ticket(
                    &ticket.id,
                    2,
                    TicketChanges {
                        quota: 5,
                        mode: TicketMode::Public
                    }
                )
                .await,
            Err(AdmissionError::TicketNotFound)
        );

        h.service.withdraw_ticket(&ticket.id, 1).await.unwrap();
        assert_eq!(h.service.ledger().remaining(&ticket.id).await.unwrap(), None);
        assert_eq!(
            h.service.create_registration(&ticket.id, 8, None).await,
            Err(AdmissionError::TicketNotFound)
        );
    }

    #[tokio::test]
    async fn test_publish_rejects_bad_drafts() {
        let h = harness();
        let empty_title = h
            .service
            .publish_ticket(
                1,
                TicketDraft {
                    title: " ".to_string(),
                    quota: 2,
                    mode: TicketMode::Public,
                },
            )
            .await;
        assert!(matches!(empty_title, Err(AdmissionError::InvalidRequest(_))));

        let zero_quota = h
            .service
            .publish_ticket(
                1,
                TicketDraft {
                    title: "x".to_string(),
                    quota: 0,
                    mode: TicketMode::Public,
                },
            )
            .await;
        assert!(matches!(zero_quota, Err(AdmissionError::InvalidRequest(_))));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_two_users_race_for_last_slot() {
        let h = harness();
        h.registry.insert_ticket("t1", 1, 1, 0, TicketMode::Public);

        let a = {
            let service = h.service.clone();
            tokio::spawn(async move { service.create_registration("t1", 100, None).await })
        };
        let b = {
            let service = h.service.clone();
            tokio::spawn(async move { service.create_registration("t1", 200, None).await })
        };
        let results = [a.await.unwrap(), b.await.unwrap()];

        let admitted = results.iter().filter(|r| r.is_ok()).count();
        let exhausted = results
            .iter()
            .filter(|r| matches!(r, Err(AdmissionError::QuotaExhausted)))
            .count();
        assert_eq!(admitted, 1);
        assert_eq!(exhausted, 1);
        assert_eq!(h.service.ledger().remaining("t1").await.unwrap(), Some(0));
    }
}
