//! In-process counter store.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use super::{CounterError, CounterStore};

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| at > now)
    }
}

/// Counter store backed by a mutex-guarded map.
///
/// Every operation holds the lock for its whole read-modify-write, which is
/// what makes `decrement_if_positive` indivisible. Only valid when all
/// admission traffic for a ticket goes through one process.
///
/// Expiry uses `tokio::time::Instant`, so tests can drive it with a paused clock.
#[derive(Debug, Default)]
pub struct MemoryCounterStore {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, Entry>>, CounterError> {
        self.entries
            .lock()
            .map_err(|_| CounterError::Unavailable("counter map lock poisoned".to_string()))
    }

    /// Returns the live entry for `key`, dropping it first if it has expired.
    fn live_entry<'a>(
        entries: &'a mut HashMap<String, Entry>,
        key: &str,
    ) -> Option<&'a mut Entry> {
        let now = Instant::now();
        if entries.get(key).is_some_and(|e| !e.is_live(now)) {
            entries.remove(key);
        }
        entries.get_mut(key)
    }

    fn parse(key: &str, value: &str) -> Result<i64, CounterError> {
        value.parse::<i64>().map_err(|_| CounterError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        })
    }
}

#[async_trait]
impl CounterStore for MemoryCounterStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CounterError> {
        let mut entries = self.lock()?;
        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Some(Instant::now() + ttl),
            },
        );
        Ok(())
    }

    async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, CounterError> {
        let mut entries = self.lock()?;
        if Self::live_entry(&mut entries, key).is_some() {
            return Ok(false);
        }
        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Some(Instant::now() + ttl),
            },
        );
        Ok(true)
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CounterError> {
        let mut entries = self.lock()?;
        Ok(Self::live_entry(&mut entries, key).map(|e| e.value.clone()))
    }

    async fn exists(&self, key: &str) -> Result<bool, CounterError> {
        let mut entries = self.lock()?;
        Ok(Self::live_entry(&mut entries, key).is_some())
    }

    async fn increment_if_present(&self, key: &str) -> Result<Option<i64>, CounterError> {
        let mut entries = self.lock()?;
        let Some(entry) = Self::live_entry(&mut entries, key) else {
            return Ok(None);
        };
        let next = Self::parse(key, &entry.value)? + 1;
        entry.value = next.to_string();
        Ok(Some(next))
    }

    async fn delete(&self, key: &str) -> Result<bool, CounterError> {
        let mut entries = self.lock()?;
        let existed = Self::live_entry(&mut entries, key).is_some();
        entries.remove(key);
        Ok(existed)
    }

    async fn decrement_if_positive(&self, key: &str) -> Result<Option<i64>, CounterError> {
        let mut entries = self.lock()?;
        let Some(entry) = Self::live_entry(&mut entries, key) else {
            return Ok(None);
        };
        match entry.value.parse::<i64>() {
            Ok(current) if current > 0 => {
                let next = current - 1;
                entry.value = next.to_string();
                Ok(Some(next))
            }
            _ => Ok(None),
        }
    }
}
