//! Trait definitions for the counter store.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CounterError {
    #[error("Counter store unavailable: {0}")]
    Unavailable(String),

    #[error("Counter store call timed out")]
    Timeout,

    #[error("Value under {key} is not an integer: {value}")]
    InvalidValue { key: String, value: String },
}

/// Shared key/value store with TTL expiry and an atomic
/// decrement-if-positive primitive.
///
/// Keys passed in are logical; implementations may namespace them.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Returns the name of this backend.
    fn name(&self) -> &str;

    /// Writes `value` under `key`, replacing any previous value and expiry.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CounterError>;

    /// Reads the value under `key`. Expired keys read as `None`.
    async fn get(&self, key: &str) -> Result<Option<String>, CounterError>;

    /// Writes `value` under `key` only if no live value is there.
    /// Returns whether the write happened. Check and write are one step.
    async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, CounterError>;

    async fn exists(&self, key: &str) -> Result<bool, CounterError>;

    /// Adds one to the integer under `key` and returns the new value, keeping
    /// the existing expiry.
    ///
    /// A missing or expired key is left absent and yields `None`.
    async fn increment_if_present(&self, key: &str) -> Result<Option<i64>, CounterError>;

    /// Removes `key`. Returns whether anything was removed.
    async fn delete(&self, key: &str) -> Result<bool, CounterError>;

    /// In one indivisible step: if the integer under `key` is strictly
    /// positive, decrements it and returns `Some(new_value)`.
    ///
    /// Returns `None` without touching the value when it is zero, negative,
    /// missing, or not an integer.
    async fn decrement_if_positive(&self, key: &str) -> Result<Option<i64>, CounterError>;
}
