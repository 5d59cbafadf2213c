//! Time-bounded full-response cache
//!
//! Stores rendered pages under versioned keys for a fixed TTL:
//! - `MemoryPageStore`: per-process `DashMap` with per-entry expiry
//! - `RedisPageStore`: shared store, one hash per page with `EXPIRE`
//! - SCAN-based namespace invalidation (no blocking KEYS)
//! - Prometheus hit/miss counters

mod error;
mod keys;
mod memory;
mod metrics;
mod redis_store;

pub use error::{CacheError, CacheResult};
pub use keys::{namespace, PageKey, CACHE_VERSION};
pub use memory::MemoryPageStore;
pub use metrics::CacheMetrics;
pub use redis_store::RedisPageStore;

use std::time::Duration;

/// A rendered response body as stored in the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedPage {
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl CachedPage {
    pub fn new(content_type: Option<String>, body: Vec<u8>) -> Self {
        Self { content_type, body }
    }
}

/// Storage backend for cached pages.
#[async_trait::async_trait]
pub trait PageStore: Send + Sync {
    /// Fetch a live entry; expired entries read as `None`.
    async fn get(&self, key: &str) -> CacheResult<Option<CachedPage>>;

    /// Store an entry that expires after `ttl`.
    async fn set(&self, key: &str, page: &CachedPage, ttl: Duration) -> CacheResult<()>;

    /// Drop every page in the namespace; returns the number of entries removed.
    async fn clear(&self) -> CacheResult<usize>;
}
