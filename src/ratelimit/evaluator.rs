//! Token bucket evaluation against the shared store.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, error, trace};

use crate::error::Result;
use crate::store::AtomicCounterStore;

use super::key::BucketKey;
use super::limit::{LimitSpec, LimitTier};
use super::metrics::RateLimitMetrics;

/// Tokens taken per guarded call.
const REQUESTED_TOKENS: f64 = 1.0;

/// Evaluates a single token bucket against the shared store.
///
/// Each evaluation is exactly one atomic store round trip; the evaluator
/// keeps no bucket state of its own, so any number of instances can
/// evaluate the same key concurrently. When the round trip cannot complete
/// the evaluator fails open: the failure is counted and logged, and the
/// call is allowed.
pub struct BucketEvaluator {
    store: Arc<dyn AtomicCounterStore>,
    metrics: Arc<RateLimitMetrics>,
}

impl BucketEvaluator {
    /// Create a new evaluator over the given store.
    pub fn new(store: Arc<dyn AtomicCounterStore>, metrics: Arc<RateLimitMetrics>) -> Self {
        Self { store, metrics }
    }

    /// Attempt to take one token from the bucket at `key`.
    ///
    /// Returns `Ok(true)` if the call is allowed. The only error surfaced
    /// is an invalid `spec`; a store failure resolves to `Ok(true)`.
    pub async fn try_acquire(
        &self,
        key: &BucketKey,
        spec: &LimitSpec,
        tier: LimitTier,
    ) -> Result<bool> {
        spec.validate()?;

        // A disabled tier allows everything without touching the store.
        if spec.is_disabled() {
            return Ok(true);
        }

        let now = now_seconds();

        trace!(
            key = %key,
            tier = %tier,
            capacity = spec.capacity,
            "Evaluating token bucket"
        );

        match self
            .store
            .try_acquire(key.as_str(), spec.capacity, spec.rate(), now, REQUESTED_TOKENS)
            .await
        {
            Ok(allowed) => {
                self.metrics.record_decision(tier, allowed);
                if !allowed {
                    debug!(key = %key, tier = %tier, "Token bucket exhausted");
                }
                Ok(allowed)
            }
            Err(e) => {
                // Fail open: the store failure is counted and logged, and
                // the call proceeds. A single failed attempt is final; no
                // retry is made.
                self.metrics.record_store_failure();
                error!(key = %key, tier = %tier, error = %e, "Rate limit store failure");
                Ok(true)
            }
        }
    }
}

/// Whole-second Unix time at the store-access instant.
fn now_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs()
}
