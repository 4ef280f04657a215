//! Capability document acquisition and caching.
//!
//! One shared slot holds the raw GetCapabilities XML with a short TTL.
//! Concurrent misses are coalesced behind a refresh lock so a thundering
//! herd of tile requests issues at most one upstream fetch per expiry.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{debug, info};

use proxy_common::{Clock, ProxyError, ProxyResult, TtlSlot};

use crate::fetch::HttpFetch;

/// Fetches and caches the upstream capability document.
pub struct CapabilityStore {
    url: String,
    fetch: Arc<dyn HttpFetch>,
    cache: TtlSlot<Arc<String>>,
    refresh: Mutex<()>,
}

impl CapabilityStore {
    pub fn new(url: impl Into<String>, fetch: Arc<dyn HttpFetch>, ttl: Duration) -> Self {
        let url = url.into();
        info!(url = %url, ttl_secs = ttl.as_secs(), "Initializing capability store");
        Self {
            url,
            fetch,
            cache: TtlSlot::new(ttl),
            refresh: Mutex::new(()),
        }
    }

    /// As [`CapabilityStore::new`] but with an injected clock for TTL tests.
    pub fn with_clock(
        url: impl Into<String>,
        fetch: Arc<dyn HttpFetch>,
        ttl: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            url: url.into(),
            fetch,
            cache: TtlSlot::with_clock(ttl, clock),
            refresh: Mutex::new(()),
        }
    }

    /// Get the capability XML, fetching upstream on miss or expiry.
    ///
    /// A non-2xx upstream status fails with `UpstreamFetch`; the caller
    /// decides whether to retry. Late arrivals during an in-flight refresh
    /// wait on the refresh lock and then re-read the slot instead of
    /// issuing a duplicate fetch.
    pub async fn get(&self) -> ProxyResult<Arc<String>> {
        if let Some(xml) = self.cache.get().await {
            debug!("capabilities cache hit");
            return Ok(xml);
        }

        let _guard = self.refresh.lock().await;
        if let Some(xml) = self.cache.get().await {
            debug!("capabilities refreshed while waiting");
            return Ok(xml);
        }

        debug!(url = %self.url, "fetching capability document");
        let response = self.fetch.get(&self.url).await?;
        if !response.is_success() {
            return Err(ProxyError::UpstreamFetch {
                url: self.url.clone(),
                message: format!("capabilities fetch returned status {}", response.status),
            });
        }

        let xml = Arc::new(String::from_utf8_lossy(&response.body).into_owned());
        self.cache.set(Arc::clone(&xml)).await;
        Ok(xml)
    }

    /// Drop the cached document; the next `get` refetches.
    pub async fn invalidate(&self) {
        self.cache.invalidate().await;
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}
