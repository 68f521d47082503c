//! Resolved stream URL cache.
//!
//! Maps a content identifier to the direct URL it resolved to. Entries expire
//! lazily on lookup; [`StreamCache::purge_expired`] is driven by a background
//! sweeper so identifiers that are never requested again don't accumulate.

use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Default TTL for resolved URLs.
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

#[derive(Clone, Debug)]
struct CacheEntry {
    url: String,
    resolved_at: Instant,
}

/// Thread-safe stream URL cache with TTL-based invalidation.
#[derive(Clone, Debug)]
pub struct StreamCache {
    entries: Arc<DashMap<String, CacheEntry>>,
    ttl: Duration,
}

impl StreamCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            ttl,
        }
    }

    /// Cached URL for `identifier` if it was resolved less than TTL ago.
    ///
    /// A stale entry is removed from the store before returning `None`.
    pub fn get(&self, identifier: &str) -> Option<String> {
        self.get_at(identifier, Instant::now())
    }

    /// Insert or overwrite the entry for `identifier`, stamped now.
    pub fn put(&self, identifier: &str, url: String) {
        self.put_at(identifier, url, Instant::now());
    }

    /// Like [`get`](StreamCache::get) but not counted in cache metrics.
    pub fn peek(&self, identifier: &str) -> Option<String> {
        self.lookup_at(identifier, Instant::now())
    }

    fn get_at(&self, identifier: &str, now: Instant) -> Option<String> {
        let found = self.lookup_at(identifier, now);
        if found.is_some() {
            debug!("Stream cache HIT for {}", identifier);
        } else {
            debug!("Stream cache MISS for {}", identifier);
        }
        crate::metrics::record_cache(found.is_some());
        found
    }

    fn lookup_at(&self, identifier: &str, now: Instant) -> Option<String> {
        if let Some(entry) = self.entries.get(identifier) {
            if now.saturating_duration_since(entry.resolved_at) < self.ttl {
                return Some(entry.url.clone());
            }
            // Stale: drop the read guard before removing
            drop(entry);
            self.entries.remove(identifier);
        }
        None
    }

    fn put_at(&self, identifier: &str, url: String, resolved_at: Instant) {
        self.entries
            .insert(identifier.to_string(), CacheEntry { url, resolved_at });
    }

    /// Remove every entry older than TTL. Returns how many were dropped.
    pub fn purge_expired(&self) -> usize {
        self.purge_expired_at(Instant::now())
    }

    fn purge_expired_at(&self, now: Instant) -> usize {
        let before = self.entries.len();
        let ttl = self.ttl;
        self.entries
            .retain(|_, entry| now.saturating_duration_since(entry.resolved_at) < ttl);
        before.saturating_sub(self.entries.len())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Spawn a task that purges stale entries every `interval` until `shutdown`
    /// is cancelled.
    pub fn spawn_sweeper(
        &self,
        interval: Duration,
        shutdown: CancellationToken,
    ) -> tokio::task::JoinHandle<()> {
        let cache = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // First tick completes immediately
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        let purged = cache.purge_expired();
                        if purged > 0 {
                            info!("Purged {} stale stream cache entries", purged);
                        }
                    }
                }
            }
            debug!("Stream cache sweeper stopped");
        })
    }
}

impl Default for StreamCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}
