//! In-process edge cache.

use async_trait::async_trait;
use axum::http::header::CACHE_CONTROL;
use dashmap::DashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::cache::clock::{Clock, SystemClock};
use crate::cache::edge::{CacheError, CacheKey, CachedResponse, EdgeCache};
use crate::cache::policy::parse_max_age;
use crate::observability::metrics;

/// Upper bound on how long any entry is kept, whatever its `max-age` says.
const MAX_LIFETIME: Duration = Duration::from_secs(10 * 365 * 24 * 60 * 60);

#[derive(Debug, Clone)]
struct Entry {
    response: CachedResponse,
    expires_at: Instant,
}

/// A thread-safe edge cache held in memory.
///
/// Entries live for the `max-age` of their own `Cache-Control` header.
/// Expired entries are dropped lazily, on lookup or when the cache fills up.
/// `max_entries` is a hard bound: stores are admitted one at a time.
#[derive(Debug, Clone)]
pub struct MemoryEdgeCache {
    inner: Arc<DashMap<CacheKey, Entry>>,
    admission: Arc<Mutex<()>>,
    clock: Arc<dyn Clock>,
    max_entries: usize,
}

impl MemoryEdgeCache {
    pub fn new(max_entries: usize) -> Self {
        Self::with_clock(max_entries, Arc::new(SystemClock))
    }

    pub fn with_clock(max_entries: usize, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
            admission: Arc::new(Mutex::new(())),
            clock,
            max_entries,
        }
    }

    /// Number of stored entries, expired or not.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Drop every expired entry.
    pub fn purge_expired(&self) {
        let now = self.clock.now();
        self.inner.retain(|_, entry| entry.expires_at > now);
        metrics::record_cache_entries(self.inner.len());
    }
}

#[async_trait]
impl EdgeCache for MemoryEdgeCache {
    async fn lookup(&self, key: &CacheKey) -> Result<Option<CachedResponse>, CacheError> {
        let now = self.clock.now();
        let hit = match self.inner.get(key) {
            Some(entry) if entry.expires_at > now => return Ok(Some(entry.response.clone())),
            Some(_) => true,
            None => false,
        };
        if hit {
            self.inner.remove_if(key, |_, entry| entry.expires_at <= now);
        }
        Ok(None)
    }

    async fn store(&self, key: CacheKey, response: CachedResponse) -> Result<(), CacheError> {
        let max_age = response
            .headers
            .get(CACHE_CONTROL)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_max_age)
            .filter(|secs| *secs > 0)
            .ok_or(CacheError::Uncacheable)?;

        let lifetime = Duration::from_secs(max_age).min(MAX_LIFETIME);
        let expires_at = self
            .clock
            .now()
            .checked_add(lifetime)
            .ok_or(CacheError::Uncacheable)?;

        // removals elsewhere only shrink the map, so holding this across
        // check and insert keeps len() <= max_entries
        let _admitted = self.admission.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if !self.inner.contains_key(&key) && self.inner.len() >= self.max_entries {
            self.purge_expired();
            if self.inner.len() >= self.max_entries {
                return Err(CacheError::Full(self.max_entries));
            }
        }
        self.inner.insert(key, Entry { response, expires_at });
        metrics::record_cache_entries(self.inner.len());
        Ok(())
    }
}
