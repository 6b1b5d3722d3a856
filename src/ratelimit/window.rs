//! Sliding window geometry.

use chrono::{DateTime, Utc};
use std::time::Duration;

use super::key::RateLimitKey;

/// Number of per-second buckets in the trailing window.
pub const WINDOW_SECONDS: u64 = 10;

/// Lifetime of a bucket after its first write. Twice the window, so a bucket
/// is always gone once no evaluation can read it.
pub const BUCKET_TTL: Duration = Duration::from_secs(WINDOW_SECONDS * 2);

/// The window of buckets visible at a particular instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlidingWindow {
    /// Unix second the evaluation falls in
    pub current_second: i64,
    /// Bucket keys, newest first; `keys[0]` is the current second
    pub keys: Vec<String>,
}

impl SlidingWindow {
    /// Build the window ending at `now` for `key`.
    pub fn at(key: &RateLimitKey, now: DateTime<Utc>) -> Self {
        // timestamp() floors, including before the epoch
        let current_second = now.timestamp();
        let keys = (0..WINDOW_SECONDS as i64)
            .map(|offset| key.bucket(current_second - offset))
            .collect();

        Self {
            current_second,
            keys,
        }
    }

    /// Key of the bucket that receives this evaluation's increment.
    pub fn current_key(&self) -> &str {
        &self.keys[0]
    }
}

/// Total units allowed across the window for a per-second limit.
pub fn window_threshold(limit_per_second: u64) -> u64 {
    limit_per_second.saturating_mul(WINDOW_SECONDS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_keys_newest_first() {
        let key = RateLimitKey::new("storage", "1").unwrap();
        let now = DateTime::from_timestamp_millis(1_704_067_200_999).unwrap();

        let window = SlidingWindow::at(&key, now);

        assert_eq!(window.current_second, 1_704_067_200);
        assert_eq!(window.keys.len(), WINDOW_SECONDS as usize);
        assert_eq!(window.current_key(), "rate-limit:storage:1:s_1704067200");
        assert_eq!(window.keys[9], "rate-limit:storage:1:s_1704067191");
    }

    #[test]
    fn test_bucket_ttl_outlives_window() {
        assert!(BUCKET_TTL > Duration::from_secs(WINDOW_SECONDS));
    }

    #[test]
    fn test_window_threshold() {
        assert_eq!(window_threshold(0), 0);
        assert_eq!(window_threshold(10), 100);
        assert_eq!(window_threshold(u64::MAX), u64::MAX);
    }
}
