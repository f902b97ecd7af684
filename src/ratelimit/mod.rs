//! Rate limiting logic: keys, bucket evaluation, and the two-tier policy.

mod evaluator;
mod guard;
mod key;
mod limit;
mod metrics;

pub use evaluator::BucketEvaluator;
pub use guard::RateLimitGuard;
pub use key::{BucketKey, CallerIdentity, KeyDeriver, Scope, DEFAULT_NAMESPACE};
pub use limit::{Decision, LimitSpec, LimitTier};
pub use metrics::{MetricsSnapshot, RateLimitMetrics};
