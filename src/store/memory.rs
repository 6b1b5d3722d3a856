//! Process-local counter store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::trace;

use super::CounterStore;
use crate::error::{Result, SlidegateError};
use crate::ratelimit::{Clock, SystemClock};

/// Expired entries are swept roughly once per this many increments.
const EVICTION_INTERVAL: u64 = 100;

#[derive(Debug, Clone, Copy)]
struct Entry {
    value: u64,
    expires_at: Option<DateTime<Utc>>,
}

impl Entry {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map_or(true, |at| now < at)
    }
}

/// An in-memory [`CounterStore`] with Redis-like expiry semantics.
///
/// Counters live only in this process, so instances sharing a limit must use
/// a shared store instead.
pub struct MemoryStore {
    entries: DashMap<String, Entry>,
    clock: Arc<dyn Clock>,
    ops_counter: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create a store whose expiry follows `clock`.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            clock,
            ops_counter: AtomicU64::new(0),
        }
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.is_live(now));
        let removed = before.saturating_sub(self.entries.len());
        if removed > 0 {
            trace!(removed, "Purged expired counters");
        }
        removed
    }

    /// Number of stored entries, expired ones included until purged.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn maybe_evict_expired(&self) {
        let count = self.ops_counter.fetch_add(1, Ordering::Relaxed);
        if count % EVICTION_INTERVAL == 0 {
            self.purge_expired();
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CounterStore for MemoryStore {
    async fn mget(&self, keys: &[String]) -> Result<Vec<Option<String>>> {
        let now = self.clock.now();
        Ok(keys
            .iter()
            .map(|key| {
                self.entries
                    .get(key)
                    .filter(|entry| entry.is_live(now))
                    .map(|entry| entry.value.to_string())
            })
            .collect())
    }

    async fn incrby(&self, key: &str, amount: u64) -> Result<u64> {
        self.maybe_evict_expired();

        let now = self.clock.now();
        let mut entry = self.entries.entry(key.to_string()).or_insert(Entry {
            value: 0,
            expires_at: None,
        });
        if !entry.is_live(now) {
            *entry = Entry {
                value: 0,
                expires_at: None,
            };
        }
        entry.value = entry.value.checked_add(amount).ok_or_else(|| {
            SlidegateError::Backend(format!("increment of {key} overflows"))
        })?;
        Ok(entry.value)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<()> {
        let now = self.clock.now();
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|e| SlidegateError::Backend(format!("invalid ttl: {e}")))?;
        if let Some(mut entry) = self.entries.get_mut(key) {
            if entry.is_live(now) {
                entry.expires_at = Some(now + ttl);
            }
        }
        Ok(())
    }
}
