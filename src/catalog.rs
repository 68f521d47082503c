//! Upstream music catalog client.
//!
//! Plain request/response lookups (song, charts, playlist, album, artist,
//! search) returned as the upstream's JSON. No caching. The client is built
//! once at startup; `healthy` tracks whether the last call reached upstream.

use crate::{
    error::{AppError, Result},
    http_retry::{RetryConfig, fetch_with_retry},
};
use reqwest::Client;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, warn};
use url::Url;

#[derive(Debug)]
pub struct CatalogClient {
    base_url: Option<Url>,
    http: Client,
    retry: RetryConfig,
    healthy: AtomicBool,
}

impl CatalogClient {
    /// A client without `base_url` answers every lookup with
    /// [`AppError::CatalogUnavailable`].
    pub fn new(base_url: Option<Url>, http: Client, retry: RetryConfig) -> Self {
        match &base_url {
            Some(url) => info!("Catalog client using {}", url),
            None => warn!("CATALOG_URL not set; catalog routes are disabled"),
        }
        Self {
            healthy: AtomicBool::new(base_url.is_some()),
            base_url,
            http,
            retry,
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Relaxed)
    }

    pub async fn song(&self, video_id: &str) -> Result<Value> {
        self.get(&["song", video_id], &[]).await
    }

    pub async fn charts(&self) -> Result<Value> {
        self.get(&["charts"], &[]).await
    }

    pub async fn playlist(&self, playlist_id: &str) -> Result<Value> {
        self.get(&["playlist", playlist_id], &[]).await
    }

    pub async fn album(&self, album_id: &str) -> Result<Value> {
        self.get(&["album", album_id], &[]).await
    }

    pub async fn artist(&self, artist_id: &str) -> Result<Value> {
        self.get(&["artist", artist_id], &[]).await
    }

    pub async fn search(&self, query: &str) -> Result<Value> {
        self.get(&["search"], &[("q", query)]).await
    }

    async fn get(&self, segments: &[&str], query: &[(&str, &str)]) -> Result<Value> {
        let url = self.endpoint(segments, query)?;

        let result = match fetch_with_retry(&self.http, &url, &self.retry).await {
            Ok(response) => response.json::<Value>().await,
            Err(e) => Err(e),
        };

        match result {
            Ok(value) => {
                self.healthy.store(true, Ordering::Relaxed);
                Ok(value)
            }
            Err(e) => {
                // A status error means upstream answered; anything else is
                // a reachability problem.
                if e.status().is_none() && !e.is_decode() {
                    self.healthy.store(false, Ordering::Relaxed);
                }
                warn!("Catalog request {} failed: {}", url, e);
                Err(AppError::Catalog(e.to_string()))
            }
        }
    }

    fn endpoint(&self, segments: &[&str], query: &[(&str, &str)]) -> Result<Url> {
        let mut url = self
            .base_url
            .clone()
            .ok_or(AppError::CatalogUnavailable)?;

        url.path_segments_mut()
            .map_err(|()| AppError::Internal("catalog URL cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(segments);

        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }

        Ok(url)
    }
}
