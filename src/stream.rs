//! Cache-fronted stream resolution.
//!
//! Concurrent misses for the same identifier are collapsed: the first caller
//! resolves while the others wait on a per-identifier lock and then read the
//! cache. A failed resolution is not cached, so a waiter that finds the cache
//! still empty resolves on its own.

use crate::{cache::StreamCache, error::Result, resolver::StreamResolver};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

#[derive(Clone)]
pub struct StreamService {
    cache: StreamCache,
    resolver: StreamResolver,
    in_flight: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl StreamService {
    pub fn new(cache: StreamCache, resolver: StreamResolver) -> Self {
        Self {
            cache,
            resolver,
            in_flight: Arc::new(DashMap::new()),
        }
    }

    pub fn cache(&self) -> &StreamCache {
        &self.cache
    }

    pub fn resolver(&self) -> &StreamResolver {
        &self.resolver
    }

    /// Direct URL for `identifier`, from cache or a fresh resolution.
    pub async fn stream_url(&self, identifier: &str) -> Result<String> {
        if let Some(url) = self.cache.get(identifier) {
            return Ok(url);
        }

        let lock = self
            .in_flight
            .entry(identifier.to_string())
            .or_default()
            .clone();

        let result = {
            let _guard = lock.lock().await;
            // Already counted as a miss above
            match self.cache.peek(identifier) {
                Some(url) => {
                    debug!("{} resolved by a concurrent request", identifier);
                    Ok(url)
                }
                None => self.resolver.resolve(identifier).await.inspect(|url| {
                    self.cache.put(identifier, url.clone());
                }),
            }
        };

        // Only the map still holds the lock: nobody else is waiting
        drop(lock);
        self.in_flight
            .remove_if(identifier, |_, entry| Arc::strong_count(entry) == 1);

        result
    }
}
