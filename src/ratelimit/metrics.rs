//! Decision and failure counters.

use std::sync::atomic::{AtomicU64, Ordering};

use super::limit::LimitTier;

/// Pre-bound counters for rate limit outcomes.
///
/// One cell per (tier, outcome) pair plus a store failure count. Counters
/// are informational only; they never influence a decision. Exposing them
/// to a metrics pipeline is the embedding host's responsibility.
#[derive(Debug, Default)]
pub struct RateLimitMetrics {
    allowed_identity: AtomicU64,
    allowed_global: AtomicU64,
    blocked_identity: AtomicU64,
    blocked_global: AtomicU64,
    store_failures: AtomicU64,
}

impl RateLimitMetrics {
    /// Create a new set of counters, all zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outcome of one bucket evaluation.
    pub fn record_decision(&self, tier: LimitTier, allowed: bool) {
        let counter = match (tier, allowed) {
            (LimitTier::Identity, true) => &self.allowed_identity,
            (LimitTier::Identity, false) => &self.blocked_identity,
            (LimitTier::Global, true) => &self.allowed_global,
            (LimitTier::Global, false) => &self.blocked_global,
        };
        counter.fetch_add(1, Ordering::SeqCst);
    }

    /// Record one store round trip that could not complete.
    pub fn record_store_failure(&self) {
        self.store_failures.fetch_add(1, Ordering::SeqCst);
    }

    /// Take a point-in-time view of all counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            allowed_identity: self.allowed_identity.load(Ordering::SeqCst),
            allowed_global: self.allowed_global.load(Ordering::SeqCst),
            blocked_identity: self.blocked_identity.load(Ordering::SeqCst),
            blocked_global: self.blocked_global.load(Ordering::SeqCst),
            store_failures: self.store_failures.load(Ordering::SeqCst),
        }
    }
}

/// Point-in-time view of the rate limit counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Evaluations allowed by the identity tier
    pub allowed_identity: u64,
    /// Evaluations allowed by the global tier
    pub allowed_global: u64,
    /// Evaluations blocked by the identity tier
    pub blocked_identity: u64,
    /// Evaluations blocked by the global tier
    pub blocked_global: u64,
    /// Store round trips that failed and were converted to allows
    pub store_failures: u64,
}

impl MetricsSnapshot {
    /// Total evaluations allowed across both tiers.
    pub fn allowed(&self) -> u64 {
        self.allowed_identity + self.allowed_global
    }

    /// Total evaluations blocked across both tiers.
    pub fn blocked(&self) -> u64 {
        self.blocked_identity + self.blocked_global
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_start_at_zero() {
        let snapshot = RateLimitMetrics::new().snapshot();

        assert_eq!(snapshot.allowed(), 0);
        assert_eq!(snapshot.blocked(), 0);
        assert_eq!(snapshot.store_failures, 0);
    }

    #[test]
    fn test_decisions_land_in_per_tier_cells() {
        let metrics = RateLimitMetrics::new();

        metrics.record_decision(LimitTier::Identity, true);
        metrics.record_decision(LimitTier::Identity, false);
        metrics.record_decision(LimitTier::Global, true);
        metrics.record_decision(LimitTier::Global, true);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.allowed_identity, 1);
        assert_eq!(snapshot.blocked_identity, 1);
        assert_eq!(snapshot.allowed_global, 2);
        assert_eq!(snapshot.blocked_global, 0);
    }

    #[test]
    fn test_store_failures_accumulate() {
        let metrics = RateLimitMetrics::new();

        metrics.record_store_failure();
        metrics.record_store_failure();

        assert_eq!(metrics.snapshot().store_failures, 2);
    }
}
