//! Durable store traits consumed by the admission workflow.

use async_trait::async_trait;
use thiserror::Error;

use super::{NewRegistrant, NewTicket, Registrant, RegistrantPage, Ticket, TicketMode, UserId};

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Not found: {0}")]
    NotFound(String),

    /// The `(user_id, ticket_id)` pair already has a registrant.
    #[error("Unique constraint violated")]
    UniqueViolation,

    #[error("Database error: {0}")]
    Database(String),
}

/// Ticket storage. Ticket metadata management beyond quota and mode lives
/// elsewhere.
#[async_trait]
pub trait TicketStore: Send + Sync {
    async fn get(&self, ticket_id: &str) -> Result<Option<Ticket>, RegistryError>;

    async fn owner_id(&self, ticket_id: &str) -> Result<UserId, RegistryError>;

    async fn mode(&self, ticket_id: &str) -> Result<TicketMode, RegistryError>;

    /// Adds one to `registered_count` as a relative update in the store.
    async fn increment_registered_count(&self, ticket_id: &str) -> Result<(), RegistryError>;

    async fn create(&self, ticket: NewTicket) -> Result<Ticket, RegistryError>;

    /// Changes quota and mode of a ticket owned by `owner_id`.
    /// Returns the ticket as stored afterwards.
    async fn update_quota(
        &self,
        ticket_id: &str,
        owner_id: UserId,
        quota: u32,
        mode: TicketMode,
    ) -> Result<Ticket, RegistryError>;

    /// Deletes a ticket owned by `owner_id` together with its registrants.
    async fn delete(&self, ticket_id: &str, owner_id: UserId) -> Result<(), RegistryError>;
}

/// Registrant storage. Enforces one registrant per `(user_id, ticket_id)`.
#[async_trait]
pub trait RegistrantStore: Send + Sync {
    /// Inserts a registrant, failing with `UniqueViolation` on a duplicate pair.
    async fn create(&self, registrant: NewRegistrant) -> Result<Registrant, RegistryError>;

    /// Marks a registrant of a ticket owned by `owner_id` as verified.
    /// Returns false when no such registrant exists. Idempotent.
    async fn mark_verified(
        &self,
        registrant_id: &str,
        ticket_id: &str,
        owner_id: UserId,
    ) -> Result<bool, RegistryError>;

    async fn list_by_user(&self, user_id: UserId) -> Result<Vec<Registrant>, RegistryError>;

    /// Registrants of a ticket owned by `owner_id`, newest first.
    /// `page` is 1-based; `search` matches the registrant id or user id.
    async fn list_by_ticket(
        &self,
        ticket_id: &str,
        owner_id: UserId,
        page: u32,
        limit: u32,
        search: Option<&str>,
    ) -> Result<RegistrantPage, RegistryError>;
}
