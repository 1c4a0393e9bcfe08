//! Short-lived, single-use tokens stored in the counter store.
//!
//! Two addressing modes:
//! - **subject-keyed**: the caller already knows the subject (a ticket/user
//!   pair for private-mode gating); the random token is the stored value.
//! - **token-keyed**: the random token itself is the key and an arbitrary
//!   payload is stored (anonymous OAuth redirect state).
//!
//! Lifecycle: `Issued -> Consumed | Expired`. Expiry is passive: it shows up as
//! `NotFound` on the next lookup.

mod issuer;

pub use issuer::{generate_token, TokenError, TokenIssuer, TokenPurpose};
