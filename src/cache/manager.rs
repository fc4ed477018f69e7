//! Resource cache implementation

use super::types::{CacheEntry, DEFAULT_TTL};
use crate::error::{Error, Result};
use std::collections::HashMap;
use std::future::Future;
use tokio::time::Duration;
use tracing::debug;

/// Keyed payload cache with a fixed TTL
///
/// Holds at most one entry per key. Owned by a single caller and passed by
/// `&mut`, so a lookup and the fetch it triggers cannot interleave with
/// another caller.
#[derive(Debug)]
pub struct ResourceCache<V = bytes::Bytes> {
    entries: HashMap<String, CacheEntry<V>>,
    ttl: Duration,
}

impl<V: Clone> Default for ResourceCache<V> {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl<V: Clone> ResourceCache<V> {
    /// Create an empty cache with the given TTL
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
        }
    }

    /// Configured TTL
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Return the cached payload for `key`, fetching it on miss or expiry
    ///
    /// On fetch failure the previous entry, stale or not, is kept as is and
    /// the error is returned.
    pub async fn get_or_fetch<F, Fut>(&mut self, key: &str, fetch: F) -> Result<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>>,
    {
        if let Some(payload) = self.fresh(key) {
            debug!("Cache hit for {}", key);
            return Ok(payload);
        }

        debug!("Cache miss for {}, fetching", key);
        let payload = fetch().await?;
        self.store(key, payload.clone());
        Ok(payload)
    }

    /// Like [`get_or_fetch`](Self::get_or_fetch), but abandons the fetch after `timeout`
    pub async fn get_or_fetch_with_timeout<F, Fut>(
        &mut self,
        key: &str,
        timeout: Duration,
        fetch: F,
    ) -> Result<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>>,
    {
        if let Some(payload) = self.fresh(key) {
            debug!("Cache hit for {}", key);
            return Ok(payload);
        }

        let payload = match tokio::time::timeout(timeout, fetch()).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(Error::Timeout {
                    timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                })
            }
        };
        self.store(key, payload.clone());
        Ok(payload)
    }

    /// Whether `key` has an entry younger than the TTL
    pub fn contains_fresh(&self, key: &str) -> bool {
        self.entries
            .get(key)
            .is_some_and(|entry| entry.is_fresh(self.ttl))
    }

    /// Drop the entry for `key`, returning whether one existed
    pub fn invalidate(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Number of entries, fresh or stale
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no entries are held
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn fresh(&self, key: &str) -> Option<V> {
        self.entries
            .get(key)
            .filter(|entry| entry.is_fresh(self.ttl))
            .map(|entry| entry.payload.clone())
    }

    fn store(&mut self, key: &str, payload: V) {
        self.entries.insert(key.to_string(), CacheEntry::new(payload));
    }
}
