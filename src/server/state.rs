use crate::{
    cache::StreamCache,
    catalog::CatalogClient,
    config::Config,
    http_retry::RetryConfig,
    metrics,
    proxy_pool::ProxyPool,
    relay::{self, RelayService},
    resolver::{ExtractionSource, HttpExtractor, StreamResolver},
    stream::StreamService,
};
use metrics_exporter_prometheus::PrometheusHandle;
use reqwest::Client;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::warn;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// Cache-fronted resolver
    pub streams: StreamService,
    pub relay: RelayService,
    pub catalog: Arc<CatalogClient>,
    pub metrics: Option<PrometheusHandle>,
    pub started_at: Instant,
}

impl AppState {
    /// Build state resolving through the configured HTTP extraction endpoint.
    pub fn new(config: Config) -> Result<Self, reqwest::Error> {
        let extractor = Arc::new(HttpExtractor::new(config.extractor_url.clone()));
        Self::with_extraction_source(config, extractor)
    }

    /// Build state around a caller-supplied extraction source.
    pub fn with_extraction_source(
        config: Config,
        source: Arc<dyn ExtractionSource>,
    ) -> Result<Self, reqwest::Error> {
        let http_client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10)
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        if config.proxies.is_empty() {
            warn!("PROXY_LIST is empty; every stream resolution will fail");
        }
        let pool = Arc::new(ProxyPool::new(config.proxies.clone()));
        let resolver = StreamResolver::new(
            pool,
            source,
            Duration::from_secs(config.resolve_timeout_secs),
        );
        let cache = StreamCache::new(Duration::from_secs(config.cache_ttl_secs));

        let relay = RelayService::new(
            relay::relay_client(config.relay_allow_private)?,
            config.relay_chunk_size,
            Duration::from_secs(config.relay_read_timeout_secs),
        );

        let catalog = CatalogClient::new(
            config.catalog_url.clone(),
            http_client,
            RetryConfig {
                timeout: Some(Duration::from_secs(15)),
                ..Default::default()
            },
        );

        Ok(Self {
            config: Arc::new(config),
            streams: StreamService::new(cache, resolver),
            relay,
            catalog: Arc::new(catalog),
            metrics: metrics::install(),
            started_at: Instant::now(),
        })
    }
}
