use dashmap::DashMap;
use std::future::Future;
use std::time::{Duration, Instant};

/// How long the rendered global feed stays valid.
pub const INDEX_CACHE_TTL: Duration = Duration::from_secs(20);

struct CacheEntry {
    body: String,
    rendered_at: Instant,
}

/// Memoizes rendered page bodies keyed by request path.
///
/// Invalidation is purely time-based. Writes do not invalidate entries;
/// a new post shows up in a cached view only after the ttl elapses or
/// `clear()` is called.
pub struct PageCache {
    ttl: Duration,
    entries: DashMap<String, CacheEntry>,
}

impl PageCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: DashMap::new(),
        }
    }

    /// Returns the cached body for `key` if it is younger than the ttl.
    /// Stale entries are evicted on read.
    pub fn get(&self, key: &str) -> Option<String> {
        match self.entries.get(key) {
            Some(entry) if entry.rendered_at.elapsed() < self.ttl => Some(entry.body.clone()),
            Some(entry) => {
                drop(entry);
                self.entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn insert(&self, key: &str, body: String) {
        self.entries.insert(
            key.to_owned(),
            CacheEntry {
                body,
                rendered_at: Instant::now(),
            },
        );
    }

    /// Returns the fresh cached body under `key`, or renders, stores and
    /// returns a new one.
    pub async fn get_or_render<E, F, Fut>(&self, key: &str, render: F) -> Result<String, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String, E>>,
    {
        if let Some(body) = self.get(key) {
            return Ok(body);
        }
        let body = render().await?;
        self.insert(key, body.clone());
        Ok(body)
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}

impl Default for PageCache {
    fn default() -> Self {
        Self::new(INDEX_CACHE_TTL)
    }
}
