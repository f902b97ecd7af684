//! Two-tier rate limit decision composition.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::FloodgateConfig;
use crate::error::Result;
use crate::store::{AtomicCounterStore, RedisCounterStore};

use super::evaluator::BucketEvaluator;
use super::key::{CallerIdentity, KeyDeriver};
use super::limit::{Decision, LimitSpec, LimitTier};
use super::metrics::{MetricsSnapshot, RateLimitMetrics};

/// Two-tier rate limit guard.
///
/// Composes a service-wide (global) limit with a per-caller (identity)
/// limit over one shared store. The global tier is checked first and a
/// denial there short-circuits the identity tier. The guard only returns
/// the decision; invoking the guarded operation, or rejecting the call,
/// is the embedding host's responsibility.
pub struct RateLimitGuard {
    keys: KeyDeriver,
    evaluator: BucketEvaluator,
    metrics: Arc<RateLimitMetrics>,
}

impl RateLimitGuard {
    /// Create a guard over the given store with the default key namespace.
    pub fn new(store: Arc<dyn AtomicCounterStore>) -> Self {
        Self::with_key_deriver(store, KeyDeriver::default())
    }

    /// Create a guard with an explicit key deriver.
    pub fn with_key_deriver(store: Arc<dyn AtomicCounterStore>, keys: KeyDeriver) -> Self {
        let metrics = Arc::new(RateLimitMetrics::new());
        let evaluator = BucketEvaluator::new(store, metrics.clone());
        Self {
            keys,
            evaluator,
            metrics,
        }
    }

    /// Connect to the store described by `config` and build a guard over it.
    pub async fn connect(config: &FloodgateConfig) -> Result<Self> {
        let store = RedisCounterStore::connect(&config.store).await?;
        Ok(Self::with_key_deriver(
            Arc::new(store),
            KeyDeriver::new(config.keys.namespace.clone()),
        ))
    }

    /// Decide whether one more call to `operation` by `caller` is allowed.
    ///
    /// `global_limit` applies to all callers of the operation combined; a
    /// capacity of 0 disables that tier entirely, in which case neither a
    /// global key nor a global store access is produced. Returns an error
    /// only for an invalid limit specification.
    pub async fn check(
        &self,
        operation: &str,
        caller: &CallerIdentity,
        identity_limit: &LimitSpec,
        global_limit: &LimitSpec,
    ) -> Result<Decision> {
        // Both tiers are validated before either is evaluated.
        identity_limit.validate()?;
        global_limit.validate()?;

        if !global_limit.is_disabled() {
            let global_key = self.keys.global_key(operation);
            if !self
                .evaluator
                .try_acquire(&global_key, global_limit, LimitTier::Global)
                .await?
            {
                warn!(key = %global_key, "Global limit exceeded");
                return Ok(Decision::Denied(LimitTier::Global));
            }
        }

        let identity_key = self.keys.identity_key(operation, caller);
        if !self
            .evaluator
            .try_acquire(&identity_key, identity_limit, LimitTier::Identity)
            .await?
        {
            warn!(key = %identity_key, "Identity limit exceeded");
            return Ok(Decision::Denied(LimitTier::Identity));
        }

        debug!(operation = %operation, caller = %caller, "Rate limit check passed");
        Ok(Decision::Allowed)
    }

    /// Current counter values.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}
