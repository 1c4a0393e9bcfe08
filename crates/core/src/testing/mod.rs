//! Test doubles for the admission workflow.
//!
//! These stand in for the SQLite registry and for a misbehaving counter
//! store so workflow tests can inject faults at exact steps.
//!
//! # Example
//!
//! ```rust,ignore
//! use ticketgate_core::testing::{FailingOp, FlakyCounterStore, MockRegistry};
//!
//! let registry = Arc::new(MockRegistry::new());
//! registry.insert_ticket("t1", 1, 10, 0, TicketMode::Public);
//! registry.fail_next_registrant_create();
//!
//! let store = Arc::new(FlakyCounterStore::new(MemoryCounterStore::new()));
//! store.fail(FailingOp::IncrementIfPresent);
//! ```

mod flaky_counter;
mod mock_registry;

pub use flaky_counter::{FailingOp, FlakyCounterStore};
pub use mock_registry::MockRegistry;
