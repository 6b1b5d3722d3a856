//! Recording store double for unit tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::Duration;

use super::CounterStore;
use crate::error::{Result, SlidegateError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Mget(Vec<String>),
    Incrby(String, u64),
    Expire(String, Duration),
}

/// Returns queued `mget` responses and records every call.
#[derive(Default)]
pub struct RecordingStore {
    mget_responses: Mutex<VecDeque<Vec<Option<&'static str>>>>,
    calls: Mutex<Vec<Call>>,
    fail: bool,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose every call fails like a dropped connection.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn push_mget(&self, values: Vec<Option<&'static str>>) {
        self.mget_responses.lock().push_back(values);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn mget_calls(&self) -> Vec<Vec<String>> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Mget(keys) => Some(keys),
                _ => None,
            })
            .collect()
    }

    pub fn incrby_calls(&self) -> Vec<(String, u64)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Incrby(key, amount) => Some((key, amount)),
                _ => None,
            })
            .collect()
    }

    pub fn expire_calls(&self) -> Vec<(String, Duration)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Expire(key, ttl) => Some((key, ttl)),
                _ => None,
            })
            .collect()
    }

    fn check(&self) -> Result<()> {
        if self.fail {
            Err(SlidegateError::Backend("connection refused".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl CounterStore for RecordingStore {
    async fn mget(&self, keys: &[String]) -> Result<Vec<Option<String>>> {
        self.calls.lock().push(Call::Mget(keys.to_vec()));
        self.check()?;
        let values = self.mget_responses.lock().pop_front().unwrap_or_default();
        Ok(values
            .into_iter()
            .map(|v| v.map(str::to_string))
            .collect())
    }

    async fn incrby(&self, key: &str, amount: u64) -> Result<u64> {
        self.calls.lock().push(Call::Incrby(key.to_string(), amount));
        self.check()?;
        Ok(amount)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<()> {
        self.calls.lock().push(Call::Expire(key.to_string(), ttl));
        self.check()
    }
}
