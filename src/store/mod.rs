//! Shared atomic counter store abstraction.
//!
//! The store holds all bucket state; the evaluating process never caches
//! it. Every decision is one round trip so that all service instances
//! observe the same counters.

mod memory;
mod redis;

pub use memory::InMemoryCounterStore;
pub use self::redis::RedisCounterStore;

use async_trait::async_trait;
use thiserror::Error;

/// Errors from the shared counter store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not be reached or the command timed out
    #[error("store unavailable: {0}")]
    Unavailable(String),
    /// The atomic evaluation failed on the store side
    #[error("script execution failed: {0}")]
    Script(String),
}

/// A store capable of one indivisible token-bucket evaluation per call.
///
/// Implementations must execute the load-refill-decrement-persist sequence
/// as a single unit relative to concurrent callers on the same key.
/// Separate read and write commands would let racing callers both observe
/// a free token and both consume it, silently exceeding the limit.
#[async_trait]
pub trait AtomicCounterStore: Send + Sync {
    /// Attempt to take `requested` tokens from the bucket at `key`.
    ///
    /// `rate` is the refill rate in tokens per second; `now_seconds` is the
    /// whole-second Unix timestamp observed by the caller at the moment of
    /// store access. A missing bucket is initialized at full `capacity`.
    /// Returns `Ok(true)` if the tokens were consumed.
    async fn try_acquire(
        &self,
        key: &str,
        capacity: u64,
        rate: f64,
        now_seconds: u64,
        requested: f64,
    ) -> Result<bool, StoreError>;
}
