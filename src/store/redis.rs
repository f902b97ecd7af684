//! Redis-backed counter store.
//!
//! The token bucket is evaluated by a Lua script executed on the Redis
//! side, so load, refill, decrement, and persist happen as one atomic unit
//! per key regardless of how many instances evaluate concurrently.

use async_trait::async_trait;
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use redis::{Client, RedisError, Script};
use std::time::Duration;
use tracing::info;

use crate::config::StoreConfig;

use super::{AtomicCounterStore, StoreError};

/// Atomic token bucket evaluation.
///
/// KEYS[1]  bucket key
/// ARGV[1]  capacity
/// ARGV[2]  refill rate, tokens per second
/// ARGV[3]  current time, whole seconds
/// ARGV[4]  tokens requested
/// ARGV[5]  key TTL, seconds
///
/// Returns 1 if the requested tokens were consumed, 0 otherwise.
const TOKEN_BUCKET_SCRIPT: &str = r#"
local capacity = tonumber(ARGV[1])
local rate = tonumber(ARGV[2])
local now = tonumber(ARGV[3])
local requested = tonumber(ARGV[4])
local ttl = tonumber(ARGV[5])

local state = redis.call('HMGET', KEYS[1], 'tokens', 'ts')
local tokens = tonumber(state[1])
local ts = tonumber(state[2])

if tokens == nil or ts == nil then
  tokens = capacity
  ts = now
end

local elapsed = now - ts
if elapsed < 0 then
  elapsed = 0
end

tokens = tokens + elapsed * rate
if tokens > capacity then
  tokens = capacity
end

local allowed = 0
if tokens >= requested then
  tokens = tokens - requested
  allowed = 1
end

redis.call('HSET', KEYS[1], 'tokens', tokens, 'ts', now)
redis.call('EXPIRE', KEYS[1], ttl)

return allowed
"#;

/// Counter store backed by a shared Redis instance.
///
/// All instances of the service point at the same Redis, which makes the
/// limits hold service-wide rather than per process.
pub struct RedisCounterStore {
    connection: ConnectionManager,
    script: Script,
    ttl_multiplier: f64,
}

impl RedisCounterStore {
    /// Connect to the store described by `config`.
    pub async fn connect(config: &StoreConfig) -> Result<Self, StoreError> {
        let client = Client::open(config.url.as_str())?;

        let manager_config = ConnectionManagerConfig::new()
            .set_connection_timeout(Duration::from_millis(config.connect_timeout_ms))
            .set_response_timeout(Duration::from_millis(config.response_timeout_ms));
        let connection = ConnectionManager::new_with_config(client, manager_config).await?;

        info!(url = %config.url, "Connected to rate limit store");

        Ok(Self {
            connection,
            script: Script::new(TOKEN_BUCKET_SCRIPT),
            ttl_multiplier: config.ttl_multiplier,
        })
    }
}

impl std::fmt::Debug for RedisCounterStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCounterStore")
            .field("ttl_multiplier", &self.ttl_multiplier)
            .finish()
    }
}

#[async_trait]
impl AtomicCounterStore for RedisCounterStore {
    async fn try_acquire(
        &self,
        key: &str,
        capacity: u64,
        rate: f64,
        now_seconds: u64,
        requested: f64,
    ) -> Result<bool, StoreError> {
        let ttl = key_ttl(capacity, rate, self.ttl_multiplier);
        let mut connection = self.connection.clone();

        let allowed: i64 = self
            .script
            .key(key)
            .arg(capacity)
            .arg(rate)
            .arg(now_seconds)
            .arg(requested)
            .arg(ttl)
            .invoke_async(&mut connection)
            .await?;

        Ok(allowed == 1)
    }
}

impl From<RedisError> for StoreError {
    fn from(err: RedisError) -> Self {
        if err.is_timeout() || err.is_connection_refusal() || err.is_io_error() {
            StoreError::Unavailable(err.to_string())
        } else {
            StoreError::Script(err.to_string())
        }
    }
}

/// TTL for a bucket key, in seconds.
///
/// Sized as a multiple of the bucket fill time: once a bucket has been idle
/// long enough to refill completely, expiring it is indistinguishable from
/// resetting it to full.
fn key_ttl(capacity: u64, rate: f64, multiplier: f64) -> u64 {
    let fill_secs = capacity as f64 / rate;
    (fill_secs * multiplier).ceil().max(1.0) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_ttl_scales_with_fill_time() {
        // capacity 10 at 10/s fills in 1s
        assert_eq!(key_ttl(10, 10.0, 2.0), 2);
        // capacity 2 at 1/s fills in 2s
        assert_eq!(key_ttl(2, 1.0, 2.0), 4);
    }

    #[test]
    fn test_key_ttl_rounds_up() {
        // 5 tokens at 2/s fills in 2.5s; TTL must cover the full window
        assert_eq!(key_ttl(5, 2.0, 1.0), 3);
    }

    #[test]
    fn test_key_ttl_is_at_least_one_second() {
        assert_eq!(key_ttl(1, 100.0, 1.0), 1);
    }
}
