//! Cache entry types

use tokio::time::{Duration, Instant};

/// Default time-to-live for cached resources
pub const DEFAULT_TTL: Duration = Duration::from_secs(60 * 60);

/// One cached payload and the instant it was retrieved
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// The payload as returned by the fetch
    pub payload: V,
    /// When the fetch completed
    pub retrieved_at: Instant,
}

impl<V> CacheEntry<V> {
    /// Create an entry retrieved now
    pub fn new(payload: V) -> Self {
        Self {
            payload,
            retrieved_at: Instant::now(),
        }
    }

    /// Time since retrieval
    pub fn age(&self) -> Duration {
        Instant::now().saturating_duration_since(self.retrieved_at)
    }

    /// An entry is fresh while its age is strictly below the TTL
    pub fn is_fresh(&self, ttl: Duration) -> bool {
        self.age() < ttl
    }
}
