//! Durable storage for tickets and registrants.

mod sqlite_store;
mod store;
mod types;

pub use sqlite_store::SqliteRegistry;
pub use store::{RegistrantStore, RegistryError, TicketStore};
pub use types::{
    NewRegistrant, NewTicket, Registrant, RegistrantPage, Ticket, TicketMode, UserId,
};
