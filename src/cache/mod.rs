//! Resource cache module
//!
//! A keyed, TTL-bounded cache that sits in front of a fetch. Entries are
//! replaced wholesale; a failed or timed-out fetch leaves the entry alone.

mod manager;
mod types;

pub use manager::ResourceCache;
pub use types::{CacheEntry, DEFAULT_TTL};

#[cfg(test)]
mod tests;
