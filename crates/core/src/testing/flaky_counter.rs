//! Counter store wrapper with injectable faults.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

use crate::counter::{CounterError, CounterStore};

/// Counter store operations that can be made to misbehave.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailingOp {
    Set,
    SetIfAbsent,
    Get,
    Exists,
    IncrementIfPresent,
    Delete,
    DecrementIfPositive,
}

#[derive(Debug, Default)]
struct Faults {
    /// Fail before reaching the inner store.
    failing: HashSet<FailingOp>,
    /// Apply on the inner store, then never answer.
    stalling: HashSet<FailingOp>,
}

/// Wraps a real counter store and fails chosen operations until healed.
///
/// A stalled operation is applied to the inner store and then hangs, which
/// is how a network timeout after a committed write looks to the caller.
pub struct FlakyCounterStore {
    inner: Arc<dyn CounterStore>,
    faults: Mutex<Faults>,
}

impl FlakyCounterStore {
    pub fn new(inner: impl CounterStore + 'static) -> Self {
        Self {
            inner: Arc::new(inner),
            faults: Mutex::new(Faults::default()),
        }
    }

    fn faults(&self) -> MutexGuard<'_, Faults> {
        self.faults.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Make `op` fail with `CounterError::Unavailable` until healed.
    pub fn fail(&self, op: FailingOp) {
        self.faults().failing.insert(op);
    }

    /// Make `op` take effect but never return until healed.
    pub fn stall_after(&self, op: FailingOp) {
        self.faults().stalling.insert(op);
    }

    /// Clear every injected fault.
    pub fn heal(&self) {
        let mut faults = self.faults();
        faults.failing.clear();
        faults.stalling.clear();
    }

    fn check(&self, op: FailingOp) -> Result<(), CounterError> {
        if self.faults().failing.contains(&op) {
            return Err(CounterError::Unavailable(format!(
                "injected failure on {op:?}"
            )));
        }
        Ok(())
    }

    async fn after(&self, op: FailingOp) {
        if self.faults().stalling.contains(&op) {
            // Long enough to outlive any call timeout used in tests.
            tokio::time::sleep(Duration::from_secs(24 * 60 * 60)).await;
        }
    }
}

#[async_trait]
impl CounterStore for FlakyCounterStore {
    fn name(&self) -> &str {
        "flaky"
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CounterError> {
        self.check(FailingOp::Set)?;
        let result = self.inner.set(key, value, ttl).await;
        self.after(FailingOp::Set).await;
        result
    }

    async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, CounterError> {
        self.check(FailingOp::SetIfAbsent)?;
        let result = self.inner.set_if_absent(key, value, ttl).await;
        self.after(FailingOp::SetIfAbsent).await;
        result
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CounterError> {
        self.check(FailingOp::Get)?;
        let result = self.inner.get(key).await;
        self.after(FailingOp::Get).await;
        result
    }

    async fn exists(&self, key: &str) -> Result<bool, CounterError> {
        self.check(FailingOp::Exists)?;
        let result = self.inner.exists(key).await;
        self.after(FailingOp::Exists).await;
        result
    }

    async fn increment_if_present(&self, key: &str) -> Result<Option<i64>, CounterError> {
        self.check(FailingOp::IncrementIfPresent)?;
        let result = self.inner.increment_if_present(key).await;
        self.after(FailingOp::IncrementIfPresent).await;
        result
    }

    async fn delete(&self, key: &str) -> Result<bool, CounterError> {
        self.check(FailingOp::Delete)?;
        let result = self.inner.delete(key).await;
        self.after(FailingOp::Delete).await;
        result
    }

    async fn decrement_if_positive(&self, key: &str) -> Result<Option<i64>, CounterError> {
        self.check(FailingOp::DecrementIfPositive)?;
        let result = self.inner.decrement_if_positive(key).await;
        self.after(FailingOp::DecrementIfPositive).await;
        result
    }
}
