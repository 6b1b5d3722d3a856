//! Sliding window rate limit evaluation.
//!
//! Usage is kept as one counter per second per key in a shared store. An
//! evaluation sums the last [`WINDOW_SECONDS`] buckets, adds the new request's
//! weight, records that weight in the current bucket, and compares the total
//! against `limit_per_second * WINDOW_SECONDS`.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, trace};

use super::key::RateLimitKey;
use super::window::{window_threshold, SlidingWindow, BUCKET_TTL, WINDOW_SECONDS};
use crate::error::{Result, SlidegateError};
use crate::store::CounterStore;

/// HTTP status callers should answer with when a request is limited.
pub const TOO_MANY_REQUESTS: u16 = 429;

/// Machine-readable reason attached to a limited outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    RateLimitExceeded,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The decision for one evaluation.
///
/// Being over the limit is a normal outcome, not an error: callers inspect
/// `rate_limited` and reject with `status` themselves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitOutcome {
    /// Units in the window including this request
    pub request_count: u64,
    /// Units allowed in the window; 0 when limiting is disabled
    pub rate_limit: u64,
    pub rate_limited: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<ErrorCode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl RateLimitOutcome {
    /// An outcome that lets the request through.
    pub fn allowed(request_count: u64, rate_limit: u64) -> Self {
        Self {
            request_count,
            rate_limit,
            rate_limited: false,
            error_code: None,
            status: None,
            error_message: None,
        }
    }

    /// An outcome rejecting the request.
    pub fn limited(request_count: u64, rate_limit: u64, message: String) -> Self {
        Self {
            request_count,
            rate_limit,
            rate_limited: true,
            error_code: Some(ErrorCode::RateLimitExceeded),
            status: Some(TOO_MANY_REQUESTS),
            error_message: Some(message),
        }
    }
}

/// Evaluate and record one request of weight `increment` for `key`.
///
/// A `limit_per_second` of zero disables limiting: the window is not read,
/// but usage is still recorded in the current bucket.
///
/// The window read and the increment are separate store calls. Two requests
/// landing in the same second can both see the sum from before either
/// increment and both pass, overshooting the limit by their combined weight.
/// The limit is only meant to be approximate, so this race is accepted.
/// Folding the read and increment into one server-side script would close it.
///
/// Store failures are returned as-is; nothing is retried here.
pub async fn evaluate<S>(
    store: &S,
    key: &RateLimitKey,
    limit_per_second: u64,
    increment: u64,
    now: DateTime<Utc>,
) -> Result<RateLimitOutcome>
where
    S: CounterStore + ?Sized,
{
    if increment == 0 {
        return Err(SlidegateError::InvalidArgument(
            "increment must be positive".into(),
        ));
    }

    let window = SlidingWindow::at(key, now);

    if limit_per_second == 0 {
        let current = store.incrby(window.current_key(), increment).await?;
        if current == increment {
            store.expire(window.current_key(), BUCKET_TTL).await?;
        }
        trace!(key = %key, increment, "Rate limiting disabled, usage recorded");
        return Ok(RateLimitOutcome::allowed(increment, 0));
    }

    let values = store.mget(&window.keys).await?;

    let mut window_total: u64 = 0;
    for (bucket, value) in window.keys.iter().zip(values.iter()) {
        window_total = window_total.saturating_add(parse_counter(bucket, value.as_deref())?);
    }
    let current_before = parse_counter(
        window.current_key(),
        values.first().and_then(|v| v.as_deref()),
    )?;
    let request_count = window_total.saturating_add(increment);

    store.incrby(window.current_key(), increment).await?;
    // A crash between these two calls leaves the bucket without a TTL.
    if current_before == 0 {
        store.expire(window.current_key(), BUCKET_TTL).await?;
    }

    let rate_limit = window_threshold(limit_per_second);

    trace!(
        key = %key,
        second = window.current_second,
        request_count,
        rate_limit,
        "Evaluated sliding window"
    );

    if request_count > rate_limit {
        debug!(
            key = %key,
            request_count,
            rate_limit,
            window_secs = WINDOW_SECONDS,
            "Rate limit exceeded"
        );
        let message = format!(
            "You've exceeded your {} rate limit at {} reqs/sec.",
            key.scope, limit_per_second
        );
        return Ok(RateLimitOutcome::limited(request_count, rate_limit, message));
    }

    Ok(RateLimitOutcome::allowed(request_count, rate_limit))
}

fn parse_counter(key: &str, value: Option<&str>) -> Result<u64> {
    match value {
        None => Ok(0),
        Some(raw) => raw.trim().parse().map_err(|_| SlidegateError::CorruptCounter {
            key: key.to_string(),
            value: raw.to_string(),
        }),
    }
}
