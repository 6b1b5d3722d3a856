//! Redis-backed counter store.

use async_trait::async_trait;
use ::redis::aio::ConnectionManager;
use std::time::Duration;
use tracing::{info, trace};

use super::CounterStore;
use crate::error::{Result, SlidegateError};

/// A [`CounterStore`] shared through Redis.
///
/// The connection manager reconnects on its own; individual command failures
/// are returned to the caller without retries.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    /// Connect to the Redis server at `url`.
    pub async fn connect(url: &str) -> Result<Self> {
        let client = ::redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        info!(url = %url, "Connected to Redis counter store");
        Ok(Self { conn })
    }
}

#[async_trait]
impl CounterStore for RedisStore {
    async fn mget(&self, keys: &[String]) -> Result<Vec<Option<String>>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.conn.clone();
        let values: Vec<Option<String>> = ::redis::cmd("MGET")
            .arg(keys)
            .query_async(&mut conn)
            .await?;
        trace!(keys = keys.len(), "MGET");
        Ok(values)
    }

    async fn incrby(&self, key: &str, amount: u64) -> Result<u64> {
        let mut conn = self.conn.clone();
        let value: i64 = ::redis::cmd("INCRBY")
            .arg(key)
            .arg(amount)
            .query_async(&mut conn)
            .await?;
        u64::try_from(value).map_err(|_| SlidegateError::CorruptCounter {
            key: key.to_string(),
            value: value.to_string(),
        })
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: () = ::redis::cmd("EXPIRE")
            .arg(key)
            .arg(ttl.as_secs())
            .query_async(&mut conn)
            .await?;
        Ok(())
    }
}
