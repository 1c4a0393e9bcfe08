//! In-memory ticket and registrant stores.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;

use crate::registry::{
    NewRegistrant, NewTicket, Registrant, RegistrantPage, RegistrantStore, RegistryError, Ticket,
    TicketMode, TicketStore, UserId,
};

#[derive(Debug, Default)]
struct State {
    tickets: HashMap<String, Ticket>,
    registrants: Vec<Registrant>,
    fail_next_registrant_create: bool,
    fail_next_increment: bool,
    durable_writes: usize,
}

/// Mock implementation of both [`TicketStore`] and [`RegistrantStore`].
///
/// Enforces the same `(user_id, ticket_id)` uniqueness as the SQLite
/// registry and counts every write attempt so tests can assert that a
/// rejected registration never reached durable storage.
#[derive(Debug, Default)]
pub struct MockRegistry {
    state: Mutex<State>,
}

impl MockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Seed a ticket directly. Not counted as a durable write.
    pub fn insert_ticket(
        &self,
        id: &str,
        owner_id: UserId,
        quota: u32,
        registered_count: u32,
        mode: TicketMode,
    ) {
        let now = Utc::now();
        self.state().tickets.insert(
            id.to_string(),
            Ticket {
                id: id.to_string(),
                owner_id,
                title: format!("Ticket {id}"),
                quota,
                registered_count,
                mode,
                created_at: now,
                updated_at: now,
            },
        );
    }

    pub fn registered_count(&self, ticket_id: &str) -> Option<u32> {
        self.state()
            .tickets
            .get(ticket_id)
            .map(|t| t.registered_count)
    }

    pub fn registrant_count(&self) -> usize {
        self.state().registrants.len()
    }

    /// Number of write calls received, successful or not.
    pub fn durable_writes(&self) -> usize {
        self.state().durable_writes
    }

    /// The next registrant insert fails with a database error.
    pub fn fail_next_registrant_create(&self) {
        self.state().fail_next_registrant_create = true;
    }

    /// The next registered-count increment fails with a database error.
    pub fn fail_next_increment(&self) {
        self.state().fail_next_increment = true;
    }
}

#[async_trait]
impl TicketStore for MockRegistry {
    async fn get(&self, ticket_id: &str) -> Result<Option<Ticket>, RegistryError> {
        Ok(self.state().tickets.get(ticket_id).cloned())
    }

    async fn owner_id(&self, ticket_id: &str) -> Result<UserId, RegistryError> {
        self.state()
            .tickets
            .get(ticket_id)
            .map(|t| t.owner_id)
            .ok_or_else(|| RegistryError::NotFound(ticket_id.to_string()))
    }

    async fn mode(&self, ticket_id: &str) -> Result<TicketMode, RegistryError> {
        self.state()
            .tickets
            .get(ticket_id)
            .map(|t| t.mode)
            .ok_or_else(|| RegistryError::NotFound(ticket_id.to_string()))
    }

    async fn increment_registered_count(&self, ticket_id: &str) -> Result<(), RegistryError> {
        let mut state = self.state();
        state.durable_writes += 1;
        if std::mem::take(&mut state.fail_next_increment) {
            return Err(RegistryError::Database("injected increment failure".to_string()));
        }
        let ticket = state
            .tickets
            .get_mut(ticket_id)
            .ok_or_else(|| RegistryError::NotFound(ticket_id.to_string()))?;
        ticket.registered_count += 1;
        ticket.updated_at = Utc::now();
        Ok(())
    }

    async fn create(&self, ticket: NewTicket) -> Result<Ticket, RegistryError> {
        let mut state = self.state();
        state.durable_writes += 1;
        if state.tickets.contains_key(&ticket.id) {
            return Err(RegistryError::UniqueViolation);
        }
        let now = Utc::now();
        let stored = Ticket {
            id: ticket.id,
            owner_id: ticket.owner_id,
            title: ticket.title,
            quota: ticket.quota,
            registered_count: 0,
            mode: ticket.mode,
            created_at: now,
            updated_at: now,
        };
        state.tickets.insert(stored.id.clone(), stored.clone());
        Ok(stored)
    }

    async fn update_quota(
        &self,
        ticket_id: &str,
        owner_id: UserId,
        quota: u32,
        mode: TicketMode,
    ) -> Result<Ticket, RegistryError> {
        let mut state = self.state();
        state.durable_writes += 1;
        let ticket = state
            .tickets
            .get_mut(ticket_id)
            .filter(|t| t.owner_id == owner_id)
            .ok_or_else(|| RegistryError::NotFound(ticket_id.to_string()))?;
        ticket.quota = quota;
        ticket.mode = mode;
        ticket.updated_at = Utc::now();
        Ok(ticket.clone())
    }

    async fn delete(&self, ticket_id: &str, owner_id: UserId) -> Result<(), RegistryError> {
        let mut state = self.state();
        state.durable_writes += 1;
        let owned = state
            .tickets
            .get(ticket_id)
            .is_some_and(|t| t.owner_id == owner_id);
        if !owned {
            return Err(RegistryError::NotFound(ticket_id.to_string()));
        }
        state.tickets.remove(ticket_id);
        state.registrants.retain(|r| r.ticket_id != ticket_id);
        Ok(())
    }
}

#[async_trait]
impl RegistrantStore for MockRegistry {
    async fn create(&self, registrant: NewRegistrant) -> Result<Registrant, RegistryError> {
        let mut state = self.state();
        state.durable_writes += 1;
        if std::mem::take(&mut state.fail_next_registrant_create) {
            return Err(RegistryError::Database("injected insert failure".to_string()));
        }
        let duplicate = state.registrants.iter().any(|r| {
            r.id == registrant.id
                || (r.user_id == registrant.user_id && r.ticket_id == registrant.ticket_id)
        });
        if duplicate {
            return Err(RegistryError::UniqueViolation);
        }

        let stored = Registrant {
            id: registrant.id,
            user_id: registrant.user_id,
            ticket_id: registrant.ticket_id,
            ticket_owner_id: registrant.ticket_owner_id,
            is_verified: false,
            created_at: Utc::now(),
        };
        state.registrants.push(stored.clone());
        Ok(stored)
    }

    async fn mark_verified(
        &self,
        registrant_id: &str,
        ticket_id: &str,
        owner_id: UserId,
    ) -> Result<bool, RegistryError> {
        let mut state = self.state();
        state.durable_writes += 1;
        match state.registrants.iter_mut().find(|r| {
            r.id == registrant_id && r.ticket_id == ticket_id && r.ticket_owner_id == owner_id
        }) {
            Some(registrant) => {
                registrant.is_verified = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list_by_user(&self, user_id: UserId) -> Result<Vec<Registrant>, RegistryError> {
        Ok(self
            .state()
            .registrants
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn list_by_ticket(
        &self,
        ticket_id: &str,
        owner_id: UserId,
        page: u32,
        limit: u32,
        search: Option<&str>,
    ) -> Result<RegistrantPage, RegistryError> {
        let matching: Vec<Registrant> = self
            .state()
            .registrants
            .iter()
            .rev()
            .filter(|r| r.ticket_id == ticket_id && r.ticket_owner_id == owner_id)
            .filter(|r| {
                search.map_or(true, |s| {
                    r.id.contains(s) || r.user_id.to_string().contains(s)
                })
            })
            .cloned()
            .collect();

        let total = matching.len() as u64;
        let skip = (page.max(1) as usize - 1) * limit as usize;
        let data = matching.into_iter().skip(skip).take(limit as usize).collect();

        Ok(RegistrantPage::new(data, total, page, limit))
    }
}
