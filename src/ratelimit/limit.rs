//! Limit specifications and decision types.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{FloodgateError, Result};

/// The tier a rate limit bucket belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LimitTier {
    /// Per-caller limit, one bucket per identity
    Identity,
    /// Service-wide limit, one bucket shared by all callers
    Global,
}

impl LimitTier {
    /// Label used in logs and metrics for this tier.
    pub fn as_str(&self) -> &'static str {
        match self {
            LimitTier::Identity => "identity",
            LimitTier::Global => "global",
        }
    }
}

impl fmt::Display for LimitTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A call-rate quota: `capacity` tokens refilled over `period_secs` seconds.
///
/// The refill rate is `capacity / period_secs` tokens per second and may be
/// fractional. A capacity of 0 disables the limit entirely.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LimitSpec {
    /// Maximum number of tokens the bucket can hold
    pub capacity: u64,
    /// Time to refill the bucket from empty, in seconds
    pub period_secs: f64,
}

impl LimitSpec {
    /// Create a new limit specification.
    pub fn new(capacity: u64, period_secs: f64) -> Self {
        Self {
            capacity,
            period_secs,
        }
    }

    /// A limit of `capacity` calls per second.
    pub fn per_second(capacity: u64) -> Self {
        Self::new(capacity, 1.0)
    }

    /// A specification that disables its tier: every call is allowed and
    /// the store is never consulted.
    pub fn disabled() -> Self {
        Self::new(0, 1.0)
    }

    /// Whether this specification disables its tier.
    pub fn is_disabled(&self) -> bool {
        self.capacity == 0
    }

    /// Refill rate in tokens per second.
    pub fn rate(&self) -> f64 {
        self.capacity as f64 / self.period_secs
    }

    /// Validate the limit specification.
    ///
    /// An invalid period is a caller bug and is surfaced as a hard error
    /// before any store access.
    pub fn validate(&self) -> Result<()> {
        if !self.period_secs.is_finite() || self.period_secs <= 0.0 {
            return Err(FloodgateError::Config(format!(
                "limit period must be greater than 0, got {}",
                self.period_secs
            )));
        }
        Ok(())
    }
}

/// The outcome of a two-tier rate limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// The call may proceed.
    Allowed,
    /// The call was denied by the given tier.
    Denied(LimitTier),
}

impl Decision {
    /// Whether the call may proceed.
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed)
    }

    /// The tier that denied the call, if any.
    pub fn denied_tier(&self) -> Option<LimitTier> {
        match self {
            Decision::Allowed => None,
            Decision::Denied(tier) => Some(*tier),
        }
    }
}
