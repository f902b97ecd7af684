//! In-process counter store.
//!
//! Implements the same token-bucket contract as the Redis store, with a
//! per-key lock standing in for server-side atomicity. State lives in this
//! process only, so limits hold per instance rather than service-wide.
//! Used by tests and by single-instance embedders that do not want Redis.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;

use super::{AtomicCounterStore, StoreError};

/// State of one token bucket.
#[derive(Debug, Clone, Copy)]
struct Bucket {
    tokens: f64,
    last_refill: u64,
}

/// Counter store keeping bucket state in process memory.
#[derive(Debug, Default)]
pub struct InMemoryCounterStore {
    buckets: DashMap<String, Mutex<Bucket>>,
    invocations: AtomicU64,
    unavailable: AtomicBool,
}

impl InMemoryCounterStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of store round trips performed so far.
    pub fn invocations(&self) -> u64 {
        self.invocations.load(Ordering::SeqCst)
    }

    /// Simulate a store outage. While set, every call fails with
    /// [`StoreError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Drop all bucket state.
    pub fn clear(&self) {
        self.buckets.clear();
    }

    /// Current token count for `key`, if the bucket exists.
    pub fn tokens(&self, key: &str) -> Option<f64> {
        self.buckets.get(key).map(|bucket| bucket.lock().tokens)
    }
}

#[async_trait]
impl AtomicCounterStore for InMemoryCounterStore {
    async fn try_acquire(
        &self,
        key: &str,
        capacity: u64,
        rate: f64,
        now_seconds: u64,
        requested: f64,
    ) -> Result<bool, StoreError> {
        self.invocations.fetch_add(1, Ordering::SeqCst);

        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(
                "simulated store outage".to_string(),
            ));
        }

        let entry = self.buckets.entry(key.to_string()).or_insert_with(|| {
            Mutex::new(Bucket {
                tokens: capacity as f64,
                last_refill: now_seconds,
            })
        });
        let mut bucket = entry.lock();

        let elapsed = now_seconds.saturating_sub(bucket.last_refill);
        bucket.tokens = (bucket.tokens + elapsed as f64 * rate).min(capacity as f64);
        bucket.last_refill = now_seconds;

        if bucket.tokens >= requested {
            bucket.tokens -= requested;
            Ok(true)
        } else {
            Ok(false)
        }
    }
}
