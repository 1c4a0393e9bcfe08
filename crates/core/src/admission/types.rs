use serde::{Deserialize, Serialize};

use crate::registry::{TicketMode, UserId};

/// Result of a successful registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Admission {
    pub registrant_id: String,
    pub ticket_id: String,
    pub user_id: UserId,
    /// Counter value right after this admission's reservation.
    pub remaining: i64,
}

/// Ticket to publish. The id is generated by the service.
#[derive(Debug, Clone, Deserialize)]
pub struct TicketDraft {
    pub title: String,
    pub quota: u32,
    #[serde(default = "default_mode")]
    pub mode: TicketMode,
}

/// Quota and mode change requested by the ticket owner.
#[derive(Debug, Clone, Deserialize)]
pub struct TicketChanges {
    pub quota: u32,
    pub mode: TicketMode,
}

fn default_mode() -> TicketMode {
    TicketMode::Private
}
