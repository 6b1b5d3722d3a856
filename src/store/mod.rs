//! Counter stores backing the sliding window.

mod memory;
mod redis;
#[cfg(test)]
pub(crate) mod testing;

pub use self::memory::MemoryStore;
pub use self::redis::RedisStore;

use async_trait::async_trait;
use std::time::Duration;

use crate::error::Result;

/// The key-value primitives the rate limiter needs from its shared store.
///
/// Implementations must make `incrby` atomic per key. Nothing else is
/// required to be atomic, and callers do not expect transactions across calls.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Read several keys at once. The result has one entry per key, in order,
    /// with `None` for keys that do not exist.
    async fn mget(&self, keys: &[String]) -> Result<Vec<Option<String>>>;

    /// Add `amount` to the counter at `key`, creating it at zero first if
    /// needed. Returns the new value.
    async fn incrby(&self, key: &str, amount: u64) -> Result<u64>;

    /// Expire `key` after `ttl`.
    async fn expire(&self, key: &str, ttl: Duration) -> Result<()>;
}
