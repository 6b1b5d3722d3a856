//! Rate limiter facade used by the service and CLI.

use parking_lot::RwLock;
use rand::Rng;
use std::sync::Arc;
use tracing::{debug, trace};

use super::clock::{Clock, SystemClock};
use super::key::{RateLimitKey, DEFAULT_NAMESPACE};
use super::limiter::{evaluate, RateLimitOutcome};
use super::rules::{RateLimitRules, ResolvedLimit};
use crate::error::Result;
use crate::store::CounterStore;

/// Resolves limits for (scope, identity) pairs and evaluates them against a
/// shared counter store.
///
/// This struct is thread-safe and can be shared across multiple tasks.
pub struct RateLimiter {
    store: Arc<dyn CounterStore>,
    clock: Arc<dyn Clock>,
    namespace: String,
    default_limit_per_second: u64,
    rules: RwLock<RateLimitRules>,
}

impl RateLimiter {
    /// Create a limiter with no rules, wall-clock time and the default namespace.
    pub fn new(store: Arc<dyn CounterStore>) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock),
            namespace: DEFAULT_NAMESPACE.to_string(),
            default_limit_per_second: 0,
            rules: RwLock::new(RateLimitRules::new()),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn with_rules(self, rules: RateLimitRules) -> Self {
        *self.rules.write() = rules;
        self
    }

    /// Limit used when neither the caller nor the rules supply one.
    pub fn with_default_limit(mut self, limit_per_second: u64) -> Self {
        self.default_limit_per_second = limit_per_second;
        self
    }

    /// Replace the rules.
    pub fn set_rules(&self, rules: RateLimitRules) {
        *self.rules.write() = rules;
    }

    /// Record `increment` units for `identity` in `scope` and decide whether
    /// the request is over its limit.
    ///
    /// `limit_override` takes precedence over the rules.
    pub async fn check(
        &self,
        scope: &str,
        identity: &str,
        limit_override: Option<u64>,
        increment: u64,
    ) -> Result<RateLimitOutcome> {
        let key = RateLimitKey::with_namespace(&self.namespace, scope, identity)?;
        let resolved = self.resolve_limit(scope, identity, limit_override);

        if !sampled(resolved.sample_rate) {
            trace!(key = %key, sample_rate = resolved.sample_rate, "Request not sampled");
            return Ok(RateLimitOutcome::allowed(0, 0));
        }

        evaluate(
            self.store.as_ref(),
            &key,
            resolved.limit_per_second,
            increment,
            self.clock.now(),
        )
        .await
    }

    fn resolve_limit(
        &self,
        scope: &str,
        identity: &str,
        limit_override: Option<u64>,
    ) -> ResolvedLimit {
        let from_rules = self.rules.read().find_limit(scope, identity);
        match (limit_override, from_rules) {
            (Some(limit_per_second), rule) => ResolvedLimit {
                limit_per_second,
                sample_rate: rule.map_or(1.0, |r| r.sample_rate),
            },
            (None, Some(rule)) => rule,
            (None, None) => {
                debug!(
                    scope = %scope,
                    limit = self.default_limit_per_second,
                    "No rule for scope, using default limit"
                );
                ResolvedLimit {
                    limit_per_second: self.default_limit_per_second,
                    sample_rate: 1.0,
                }
            }
        }
    }
}

fn sampled(sample_rate: f64) -> bool {
    if sample_rate >= 1.0 {
        return true;
    }
    rand::thread_rng().gen::<f64>() < sample_rate
}
