//! Durable entities referenced by the admission workflow.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Numeric user identifier, as issued by the login collaborator.
pub type UserId = u64;

/// Whether registering requires a gate token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketMode {
    /// Anyone may register while slots remain.
    Public,
    /// Registration requires a single-use gate token bound to the user.
    Private,
}

impl TicketMode {
    pub fn is_private(&self) -> bool {
        matches!(self, TicketMode::Private)
    }

    pub(crate) fn from_flag(private: bool) -> Self {
        if private {
            TicketMode::Private
        } else {
            TicketMode::Public
        }
    }
}

/// A published ticket. Only `registered_count` changes during admission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: String,
    pub owner_id: UserId,
    pub title: String,
    pub quota: u32,
    pub registered_count: u32,
    pub mode: TicketMode,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Ticket {
    /// Slots left according to durable state alone.
    pub fn durable_remaining(&self) -> i64 {
        i64::from(self.quota) - i64::from(self.registered_count)
    }
}

/// Request to publish a new ticket.
#[derive(Debug, Clone)]
pub struct NewTicket {
    pub id: String,
    pub owner_id: UserId,
    pub title: String,
    pub quota: u32,
    pub mode: TicketMode,
}

/// A user's claim on one slot of a ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registrant {
    pub id: String,
    pub user_id: UserId,
    pub ticket_id: String,
    pub ticket_owner_id: UserId,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
}

/// Registrant row to insert; `is_verified` always starts false.
#[derive(Debug, Clone)]
pub struct NewRegistrant {
    pub id: String,
    pub user_id: UserId,
    pub ticket_id: String,
    pub ticket_owner_id: UserId,
}

/// One page of a ticket's registrants, as seen by the ticket owner.
#[derive(Debug, Clone, Serialize)]
pub struct RegistrantPage {
    pub data: Vec<Registrant>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u32,
}

impl RegistrantPage {
    pub fn new(data: Vec<Registrant>, total: u64, page: u32, limit: u32) -> Self {
        let total_pages = if limit == 0 {
            0
        } else {
            total.div_ceil(u64::from(limit)) as u32
        };
        Self {
            data,
            total,
            page,
            limit,
            total_pages,
        }
    }
}
