//! Bounded retry with backoff
//!
//! Shared by the HTTP fetcher and the warehouse uploader, the two places
//! where transient network and quota errors are expected.

use crate::error::{Error, Result};
use crate::types::BackoffType;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// How many times to retry and how long to wait between attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry
    #[serde(with = "millis")]
    pub initial_backoff: Duration,
    /// Upper bound for any single delay
    #[serde(with = "millis")]
    pub max_backoff: Duration,
    /// Growth of the delay between attempts
    pub backoff_type: BackoffType,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(60),
            backoff_type: BackoffType::Exponential,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Calculate backoff delay for a given attempt (0-based)
    pub fn delay(&self, attempt: u32) -> Duration {
        let delay = match self.backoff_type {
            BackoffType::Constant => self.initial_backoff,
            BackoffType::Linear => self.initial_backoff * (attempt + 1),
            BackoffType::Exponential => {
                let factor = 2u32.saturating_pow(attempt);
                self.initial_backoff * factor
            }
        };

        std::cmp::min(delay, self.max_backoff)
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, or
    /// the retry budget is spent.
    pub async fn run<T, F, Fut>(&self, what: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    let delay = self.delay(attempt);
                    warn!(
                        "{what} failed ({e}), attempt {}/{}, retrying in {delay:?}",
                        attempt + 1,
                        self.max_retries + 1
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) if e.is_retryable() && self.max_retries > 0 => {
                    warn!("{what} failed after {} attempts: {e}", attempt + 1);
                    return Err(e);
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Exhausted-retry error for callers that track attempts themselves
pub fn exhausted(max_retries: u32, last: Option<Error>) -> Error {
    last.unwrap_or(Error::MaxRetriesExceeded { max_retries })
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}
