//! Bucket key derivation.

use std::fmt;

/// Default namespace prefix for bucket keys.
pub const DEFAULT_NAMESPACE: &str = "rate_limit";

/// Key segment used for global-scope buckets.
const GLOBAL_SEGMENT: &str = "global";

/// The identity of the caller of a guarded operation.
///
/// Identity extraction happens outside this crate; the transport layer
/// maps an authenticated principal to [`CallerIdentity::User`] and an
/// anonymous one to [`CallerIdentity::Ip`]. When no request context is
/// available at all, [`CallerIdentity::Unknown`] routes every such caller
/// into one shared bucket rather than failing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CallerIdentity {
    /// Authenticated caller, identified by user id
    User(String),
    /// Anonymous caller, identified by client IP address
    Ip(String),
    /// No request context available
    Unknown,
}

impl fmt::Display for CallerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallerIdentity::User(id) => write!(f, "user:{}", id),
            CallerIdentity::Ip(addr) => write!(f, "ip:{}", addr),
            CallerIdentity::Unknown => write!(f, "ip:unknown"),
        }
    }
}

/// The scope a bucket applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope<'a> {
    /// One bucket per caller identity
    Identity(&'a CallerIdentity),
    /// One bucket shared by every caller of the operation
    Global,
}

/// A key uniquely identifying one logical token bucket in the shared store.
///
/// Two calls map to the same key exactly when they should contend for the
/// same bucket; scopes and operations never collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BucketKey(String);

impl BucketKey {
    /// The key as a string slice, suitable for the store.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BucketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Derives bucket keys from an operation and a caller scope.
///
/// Derivation is pure string composition: no I/O, no failure modes, and
/// identical inputs always yield the identical key, so keys can be tested
/// without a store.
#[derive(Debug, Clone)]
pub struct KeyDeriver {
    namespace: String,
}

impl KeyDeriver {
    /// Create a deriver with the given namespace prefix.
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }

    /// Derive the bucket key for `operation` under `scope`.
    pub fn derive(&self, operation: &str, scope: Scope<'_>) -> BucketKey {
        let key = match scope {
            Scope::Identity(caller) => {
                format!("{}:{}:{}", self.namespace, caller, operation)
            }
            Scope::Global => format!("{}:{}:{}", self.namespace, GLOBAL_SEGMENT, operation),
        };
        BucketKey(key)
    }

    /// Derive the per-caller key for `operation`.
    pub fn identity_key(&self, operation: &str, caller: &CallerIdentity) -> BucketKey {
        self.derive(operation, Scope::Identity(caller))
    }

    /// Derive the shared key for `operation`, independent of caller.
    pub fn global_key(&self, operation: &str) -> BucketKey {
        self.derive(operation, Scope::Global)
    }
}

impl Default for KeyDeriver {
    fn default() -> Self {
        Self::new(DEFAULT_NAMESPACE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_key_format() {
        let keys = KeyDeriver::default();
        let caller = CallerIdentity::User("alice42".to_string());

        let key = keys.identity_key("search_products", &caller);
        assert_eq!(key.as_str(), "rate_limit:user:alice42:search_products");
    }

    #[test]
    fn test_ip_key_format() {
        let keys = KeyDeriver::default();
        let caller = CallerIdentity::Ip("10.0.0.7".to_string());

        let key = keys.identity_key("search_products", &caller);
        assert_eq!(key.as_str(), "rate_limit:ip:10.0.0.7:search_products");
    }

    #[test]
    fn test_unknown_caller_shares_one_bucket() {
        let keys = KeyDeriver::default();

        let a = keys.identity_key("login", &CallerIdentity::Unknown);
        let b = keys.identity_key("login", &CallerIdentity::Unknown);

        assert_eq!(a, b);
        assert_eq!(a.as_str(), "rate_limit:ip:unknown:login");
    }

    #[test]
    fn test_global_key_has_no_caller_segment() {
        let keys = KeyDeriver::default();

        let key = keys.global_key("search_products");
        assert_eq!(key.as_str(), "rate_limit:global:search_products");
    }

    #[test]
    fn test_derivation_is_deterministic() {
        let keys = KeyDeriver::default();
        let caller = CallerIdentity::User("alice".to_string());

        let first = keys.derive("op", Scope::Identity(&caller));
        let second = keys.derive("op", Scope::Identity(&caller));
        assert_eq!(first, second);
    }

    #[test]
    fn test_distinct_callers_get_distinct_keys() {
        let keys = KeyDeriver::default();
        let alice = CallerIdentity::User("alice".to_string());
        let bob = CallerIdentity::User("bob".to_string());

        assert_ne!(
            keys.identity_key("op", &alice),
            keys.identity_key("op", &bob)
        );
    }

    #[test]
    fn test_scopes_and_operations_do_not_collide() {
        let keys = KeyDeriver::default();
        let caller = CallerIdentity::User("global".to_string());

        // A user literally named "global" must not alias the global bucket.
        assert_ne!(keys.identity_key("op", &caller), keys.global_key("op"));
        assert_ne!(keys.global_key("op_a"), keys.global_key("op_b"));
    }

    #[test]
    fn test_custom_namespace() {
        let keys = KeyDeriver::new("quota");

        let key = keys.global_key("op");
        assert_eq!(key.as_str(), "quota:global:op");
    }
}
