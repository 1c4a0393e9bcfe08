//! Redis-backed counter store.
//!
//! Keys are stored as `{prefix}{key}`. The prefix is applied to every
//! operation so counters and tokens from different deployments sharing one
//! Redis never collide.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, RedisError, Script};

use super::{CounterError, CounterStore};

/// Checks and decrements in one server-side step. Returns the new value, or
/// -1 when the stored value is missing, non-numeric, or not positive.
const DECREMENT_IF_POSITIVE: &str = r#"
local current = tonumber(redis.call("GET", KEYS[1]))
if current ~= nil and current > 0 then
    return redis.call("DECR", KEYS[1])
end
return -1
"#;

/// Increments only an existing key so a compensating release can never
/// recreate an expired counter without its TTL.
const INCREMENT_IF_PRESENT: &str = r#"
if redis.call("EXISTS", KEYS[1]) == 1 then
    return redis.call("INCR", KEYS[1])
end
return false
"#;

/// Counter store backed by a shared Redis instance.
///
/// `Clone` is cheap; clones share the same `ConnectionManager`.
#[derive(Clone)]
pub struct RedisCounterStore {
    conn_manager: ConnectionManager,
    prefix: String,
    timeout: Duration,
    decrement_script: Script,
    increment_script: Script,
}

impl RedisCounterStore {
    /// Connects to Redis at `redis_url`.
    ///
    /// # Errors
    ///
    /// Returns `CounterError::Unavailable` if the URL is malformed or the
    /// initial connection fails.
    pub async fn new(
        redis_url: &str,
        prefix: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, CounterError> {
        let client = Client::open(redis_url).map_err(|e| {
            CounterError::Unavailable(format!("Failed to create Redis client: {e}"))
        })?;

        let conn_manager = tokio::time::timeout(timeout, ConnectionManager::new(client))
            .await
            .map_err(|_| CounterError::Timeout)?
            .map_err(|e| {
                CounterError::Unavailable(format!("Failed to connect to Redis: {e}"))
            })?;

        tracing::info!("RedisCounterStore initialized");

        Ok(Self {
            conn_manager,
            prefix: prefix.into(),
            timeout,
            decrement_script: Script::new(DECREMENT_IF_POSITIVE),
            increment_script: Script::new(INCREMENT_IF_PRESENT),
        })
    }

    fn key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    async fn bounded<T, F>(&self, op: &'static str, fut: F) -> Result<T, CounterError>
    where
        F: Future<Output = Result<T, RedisError>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(CounterError::Unavailable(format!("{op} failed: {e}"))),
            Err(_) => {
                tracing::warn!(op, timeout_ms = self.timeout.as_millis() as u64, "Redis call timed out");
                Err(CounterError::Timeout)
            }
        }
    }
}

#[async_trait]
impl CounterStore for RedisCounterStore {
    fn name(&self) -> &str {
        "redis"
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CounterError> {
        let mut conn = self.conn_manager.clone();
        let key = self.key(key);
        let millis = (ttl.as_millis() as u64).max(1);
        self.bounded("PSETEX", conn.pset_ex::<_, _, ()>(&key, value, millis))
            .await
    }

    async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, CounterError> {
        let mut conn = self.conn_manager.clone();
        let key = self.key(key);
        let millis = (ttl.as_millis() as u64).max(1);
        let mut cmd = redis::cmd("SET");
        cmd.arg(&key).arg(value).arg("NX").arg("PX").arg(millis);
        let reply: Option<String> = self
            .bounded("SET NX", cmd.query_async(&mut conn))
            .await?;
        Ok(reply.is_some())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CounterError> {
        let mut conn = self.conn_manager.clone();
        let key = self.key(key);
        self.bounded("GET", conn.get::<_, Option<String>>(&key)).await
    }

    async fn exists(&self, key: &str) -> Result<bool, CounterError> {
        let mut conn = self.conn_manager.clone();
        let key = self.key(key);
        self.bounded("EXISTS", conn.exists::<_, bool>(&key)).await
    }

    async fn increment_if_present(&self, key: &str) -> Result<Option<i64>, CounterError> {
        let mut conn = self.conn_manager.clone();
        let key = self.key(key);
        let invocation = self.increment_script.key(&key);
        self.bounded("EVALSHA", invocation.invoke_async(&mut conn)).await
    }

    async fn delete(&self, key: &str) -> Result<bool, CounterError> {
        let mut conn = self.conn_manager.clone();
        let key = self.key(key);
        let removed: i64 = self.bounded("DEL", conn.del::<_, i64>(&key)).await?;
        Ok(removed > 0)
    }

    async fn decrement_if_positive(&self, key: &str) -> Result<Option<i64>, CounterError> {
        let mut conn = self.conn_manager.clone();
        let key = self.key(key);
        let invocation = self.decrement_script.key(&key);
        let result: i64 = self
            .bounded("EVALSHA", invocation.invoke_async(&mut conn))
            .await?;
        Ok((result >= 0).then_some(result))
    }
}
