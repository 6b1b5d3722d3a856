//! Per-scope limit rules.
//!
//! Rules name a requests-per-second limit for each service scope, optionally
//! overridden for individual identities, plus the fraction of requests that
//! are counted at all.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use crate::error::{Result, SlidegateError};

/// All configured scopes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RateLimitRules {
    #[serde(default)]
    pub scopes: Vec<ScopeRule>,
}

/// Limits for one service scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScopeRule {
    /// Scope name, matched exactly
    pub scope: String,
    /// Requests per second for identities without an override
    pub limit_per_second: u64,
    /// Fraction of requests that are evaluated, in `[0, 1]`
    #[serde(default = "default_sample_rate")]
    pub sample_rate: f64,
    /// Identity-specific limits
    #[serde(default)]
    pub overrides: Vec<IdentityOverride>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IdentityOverride {
    pub identity: String,
    pub limit_per_second: u64,
}

fn default_sample_rate() -> f64 {
    1.0
}

fn parse_error(e: serde_yaml::Error) -> SlidegateError {
    SlidegateError::Config(format!("Failed to parse rate limit rules: {}", e))
}

/// The limit resolved for a (scope, identity) pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedLimit {
    pub limit_per_second: u64,
    pub sample_rate: f64,
}

impl RateLimitRules {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load rules from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading rate limit rules");

        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Parse rules from YAML. Accepts either a single scope document or a
    /// `scopes:` list.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let document: serde_yaml::Value = serde_yaml::from_str(yaml).map_err(parse_error)?;

        // The shape is picked up front so a broken single-scope document
        // reports its own error instead of parsing as an empty list.
        let rules = if document.get("scopes").is_some() {
            serde_yaml::from_value(document).map_err(parse_error)?
        } else {
            RateLimitRules {
                scopes: vec![serde_yaml::from_value(document).map_err(parse_error)?],
            }
        };
        rules.validate()?;
        Ok(rules)
    }

    fn validate(&self) -> Result<()> {
        for rule in &self.scopes {
            if rule.scope.is_empty() || rule.scope.contains(':') {
                return Err(SlidegateError::Config(format!(
                    "invalid scope name {:?}",
                    rule.scope
                )));
            }
            if !(0.0..=1.0).contains(&rule.sample_rate) {
                return Err(SlidegateError::Config(format!(
                    "sample_rate for scope {} must be within [0, 1], got {}",
                    rule.scope, rule.sample_rate
                )));
            }
        }
        Ok(())
    }

    pub fn get_scope(&self, scope: &str) -> Option<&ScopeRule> {
        self.scopes.iter().find(|rule| rule.scope == scope)
    }

    /// Find the limit for `identity` within `scope`. An identity override wins
    /// over the scope-wide limit.
    pub fn find_limit(&self, scope: &str, identity: &str) -> Option<ResolvedLimit> {
        let rule = self.get_scope(scope)?;
        let limit_per_second = rule
            .overrides
            .iter()
            .find(|o| o.identity == identity)
            .map_or(rule.limit_per_second, |o| o.limit_per_second);

        Some(ResolvedLimit {
            limit_per_second,
            sample_rate: rule.sample_rate,
        })
    }
}
