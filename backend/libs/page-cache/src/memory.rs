use crate::{CacheResult, CachedPage, PageStore};
use dashmap::DashMap;
use std::time::{Duration, Instant};
use tracing::debug;

/// Entries beyond this count trigger a sweep of expired pages on write.
const SWEEP_THRESHOLD: usize = 1024;

struct Entry {
    expires_at: Instant,
    page: CachedPage,
}

/// In-process page store. Each worker process holds its own copy.
#[derive(Default)]
pub struct MemoryPageStore {
    entries: DashMap<String, Entry>,
}

impl MemoryPageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn purge_expired(&self) {
        let now = Instant::now();
        self.entries.retain(|_, entry| entry.expires_at > now);
    }
}

#[async_trait::async_trait]
impl PageStore for MemoryPageStore {
    async fn get(&self, key: &str) -> CacheResult<Option<CachedPage>> {
        let now = Instant::now();
        if let Some(entry) = self.entries.get(key) {
            if entry.expires_at > now {
                return Ok(Some(entry.page.clone()));
            }
        }
        // Expired or absent; remove only if still expired to avoid racing a fresh write.
        self.entries.remove_if(key, |_, entry| entry.expires_at <= now);
        Ok(None)
    }

    async fn set(&self, key: &str, page: &CachedPage, ttl: Duration) -> CacheResult<()> {
        if self.entries.len() >= SWEEP_THRESHOLD {
            self.purge_expired();
        }
        self.entries.insert(
            key.to_string(),
            Entry {
                expires_at: Instant::now() + ttl,
                page: page.clone(),
            },
        );
        debug!(key = %key, ttl_ms = ttl.as_millis() as u64, "Page cache set");
        Ok(())
    }

    async fn clear(&self) -> CacheResult<usize> {
        let removed = self.entries.len();
        self.entries.clear();
        debug!(removed, "Page cache cleared");
        Ok(removed)
    }
}
