//! Application state and shared resources.

use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use tile_cache::{ByteCache, CacheBackend, MemoryBackend, ObjectStorageBackend};
use wmts_client::{
    CapabilityStore, HttpFetch, ReqwestFetch, TileAddressBuilder, TilingGridSelector,
    TimestampIndex,
};

use crate::config::ProxyConfig;
use crate::gateway::ProxyGateway;
use crate::rate_limit::RateLimiter;

/// Shared application state.
pub struct AppState {
    pub gateway: ProxyGateway,
    pub timestamps: Arc<TimestampIndex>,
    pub config: ProxyConfig,
}

impl AppState {
    /// Wire the component graph from configuration.
    pub fn new(config: ProxyConfig) -> Result<Self> {
        let fetch: Arc<dyn HttpFetch> = Arc::new(ReqwestFetch::new(config.upstream_timeout)?);
        Self::with_fetch(config, fetch)
    }

    /// As [`AppState::new`] with an injected fetch implementation, the
    /// seam integration tests build on.
    pub fn with_fetch(config: ProxyConfig, fetch: Arc<dyn HttpFetch>) -> Result<Self> {
        let capabilities = Arc::new(CapabilityStore::new(
            config.capabilities_url.clone(),
            Arc::clone(&fetch),
            config.capability_ttl,
        ));
        let timestamps = Arc::new(TimestampIndex::new(
            Arc::clone(&capabilities),
            config.timestamp_ttl,
        ));
        let grids = Arc::new(TilingGridSelector::new(Arc::clone(&capabilities)));
        let tile_urls = Arc::new(TileAddressBuilder::new(config.tile_base.clone(), grids));

        let backend: Arc<dyn CacheBackend> = match &config.object_storage {
            Some(storage) => {
                info!(bucket = %storage.bucket, "using object-storage cache backend");
                Arc::new(ObjectStorageBackend::new(storage)?)
            }
            None => Arc::new(MemoryBackend::new()),
        };
        let cache = Arc::new(ByteCache::new(backend, config.cache_policy.clone()));

        let limiter = Arc::new(RateLimiter::new(
            config.rate_burst,
            config.rate_refill_per_sec,
        ));

        let gateway = ProxyGateway::new(
            Arc::clone(&timestamps),
            tile_urls,
            cache,
            limiter,
            fetch,
            config.allow_hosts.clone(),
        );

        Ok(Self {
            gateway,
            timestamps,
            config,
        })
    }
}
