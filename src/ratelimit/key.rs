//! Counter key generation.

use crate::error::{Result, SlidegateError};

/// Namespace used when the configuration does not set one.
pub const DEFAULT_NAMESPACE: &str = "rate-limit";

/// Identifies the counters of one identity within one service scope.
///
/// Bucket keys have the form `<namespace>:<scope>:<identity>:s_<unix_second>`.
/// Scopes may not contain `:` and the second is always numeric, so distinct
/// (scope, identity, second) triples never share a key even when identities
/// contain colons themselves.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RateLimitKey {
    /// Store-wide prefix
    pub namespace: String,
    /// Service scope, e.g. `storage`
    pub scope: String,
    /// Tenant identity within the scope
    pub identity: String,
}

impl RateLimitKey {
    /// Create a key under the default namespace.
    pub fn new(scope: &str, identity: &str) -> Result<Self> {
        Self::with_namespace(DEFAULT_NAMESPACE, scope, identity)
    }

    /// Create a key under a custom namespace.
    pub fn with_namespace(namespace: &str, scope: &str, identity: &str) -> Result<Self> {
        if scope.is_empty() {
            return Err(SlidegateError::InvalidArgument("scope is required".into()));
        }
        if scope.contains(':') {
            return Err(SlidegateError::InvalidArgument(format!(
                "scope {scope:?} must not contain ':'"
            )));
        }
        if identity.is_empty() {
            return Err(SlidegateError::InvalidArgument("identity is required".into()));
        }

        Ok(Self {
            namespace: namespace.to_string(),
            scope: scope.to_string(),
            identity: identity.to_string(),
        })
    }

    /// The prefix shared by all buckets of this key.
    pub fn prefix(&self) -> String {
        format!("{}:{}:{}", self.namespace, self.scope, self.identity)
    }

    /// The store key for the bucket covering `unix_second`.
    pub fn bucket(&self, unix_second: i64) -> String {
        format!("{}:s_{}", self.prefix(), unix_second)
    }
}

impl std::fmt::Display for RateLimitKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.prefix())
    }
}
