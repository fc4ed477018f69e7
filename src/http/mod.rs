//! HTTP fetcher
//!
//! Every pipeline talks to its external API through [`HttpClient`].
//!
//! - **Automatic Retries**: transient failures (5xx, 429, timeouts,
//!   connection errors) are retried with bounded backoff
//! - **Rate Limiting**: token bucket limiter using governor, shareable
//!   across clients
//! - **Timeouts**: per-client default, overridable per request

mod client;
mod rate_limit;

pub use client::{HttpClient, HttpClientConfig, HttpClientConfigBuilder, RequestConfig};
pub use rate_limit::{RateLimiter, RateLimiterConfig};
