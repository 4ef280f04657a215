//! Request orchestration: validation, admission, cache, upstream.

use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, info, instrument, warn};
use url::Url;

use proxy_common::{ProxyError, ProxyResult, TileRequest};
use tile_cache::ByteCache;
use wmts_client::{HttpFetch, TileAddressBuilder, TileUrlParams, TimestampIndex};

use crate::metrics;
use crate::rate_limit::RateLimiter;

/// Route keys for the rate limiter.
const ROUTE_TILE: &str = "tile";
const ROUTE_PROXY: &str = "proxy";

/// Outcome of a proxied request. Non-2xx upstream statuses are forwarded
/// verbatim through this type rather than translated into errors.
#[derive(Debug, Clone)]
pub struct ProxiedResponse {
    pub status: u16,
    pub body: Bytes,
    pub content_type: String,
    /// TTL the response may be cached for, surfaced to clients as
    /// `Cache-Control: public, max-age=<ttl>`.
    pub cache_ttl_secs: u64,
    pub cache_hit: bool,
}

/// Orchestrates tile and generic passthrough requests.
pub struct ProxyGateway {
    timestamps: Arc<TimestampIndex>,
    tile_urls: Arc<TileAddressBuilder>,
    cache: Arc<ByteCache>,
    limiter: Arc<RateLimiter>,
    fetch: Arc<dyn HttpFetch>,
    allow_hosts: Vec<String>,
}

impl ProxyGateway {
    pub fn new(
        timestamps: Arc<TimestampIndex>,
        tile_urls: Arc<TileAddressBuilder>,
        cache: Arc<ByteCache>,
        limiter: Arc<RateLimiter>,
        fetch: Arc<dyn HttpFetch>,
        allow_hosts: Vec<String>,
    ) -> Self {
        Self {
            timestamps,
            tile_urls,
            cache,
            limiter,
            fetch,
            allow_hosts,
        }
    }

    /// Serve one tile request.
    ///
    /// Flow: resolve time (explicit times must be members of the layer's
    /// timestamp set; absent times resolve to latest) → rate-limit gate →
    /// build upstream URL → cache lookup → upstream fetch → best-effort
    /// cache store.
    #[instrument(skip(self), fields(layer = %request.layer, z = request.z, y = request.y, x = request.x))]
    pub async fn tile(&self, request: &TileRequest) -> ProxyResult<ProxiedResponse> {
        let time = self.resolve_time(request).await?;

        if !self.limiter.admit(ROUTE_TILE).await {
            metrics::record_rate_limited(ROUTE_TILE);
            return Err(ProxyError::RateLimited(ROUTE_TILE.into()));
        }

        let upstream_url = self
            .tile_urls
            .build_url(TileUrlParams {
                layer_id: &request.layer,
                z: request.z,
                y: request.y,
                x: request.x,
                time: &time,
                grid: None,
                ext: Some(&request.ext),
            })
            .await;

        debug!(url = %upstream_url, "tile resolved");
        self.fetch_through_cache(&upstream_url).await
    }

    /// Serve a generic passthrough request. The host allowlist is checked
    /// before any network access.
    #[instrument(skip(self))]
    pub async fn passthrough(&self, target: &str) -> ProxyResult<ProxiedResponse> {
        if !self.host_allowed(target) {
            return Err(ProxyError::HostNotAllowed(target.to_string()));
        }

        if !self.limiter.admit(ROUTE_PROXY).await {
            metrics::record_rate_limited(ROUTE_PROXY);
            return Err(ProxyError::RateLimited(ROUTE_PROXY.into()));
        }

        self.fetch_through_cache(target).await
    }

    /// Resolve the timestamp to request upstream.
    async fn resolve_time(&self, request: &TileRequest) -> ProxyResult<String> {
        match &request.time {
            Some(requested) => {
                let available = self.timestamps.timestamps(&request.layer).await?;
                if available.iter().any(|t| t == requested) {
                    Ok(requested.clone())
                } else {
                    warn!(
                        layer = %request.layer,
                        time = %requested,
                        available = available.len(),
                        "explicit time not in layer timestamp set"
                    );
                    Err(ProxyError::InvalidTime {
                        layer: request.layer.clone(),
                        time: requested.clone(),
                        available_count: available.len(),
                        latest_available: available.last().cloned(),
                    })
                }
            }
            None => self
                .timestamps
                .latest(&request.layer)
                .await?
                .ok_or_else(|| ProxyError::NoTimestamps(request.layer.clone())),
        }
    }

    /// Cache-aware upstream fetch shared by both flows.
    async fn fetch_through_cache(&self, target: &str) -> ProxyResult<ProxiedResponse> {
        let ttl = self.cache.ttl_for(target);

        if let Some(hit) = self.cache.lookup(target).await {
            metrics::record_cache_hit();
            let content_type = hit
                .content_type
                .unwrap_or_else(|| infer_content_type(target).to_string());
            return Ok(ProxiedResponse {
                status: 200,
                body: hit.body,
                content_type,
                cache_ttl_secs: ttl,
                cache_hit: true,
            });
        }
        metrics::record_cache_miss();

        metrics::record_upstream_fetch();
        let response = self.fetch.get(target).await?;

        if !response.is_success() {
            // Forwarded verbatim; error bodies are never cached.
            info!(target = target, status = response.status, "upstream non-success forwarded");
            return Ok(ProxiedResponse {
                status: response.status,
                content_type: response
                    .content_type
                    .unwrap_or_else(|| "application/octet-stream".to_string()),
                body: response.body,
                cache_ttl_secs: 0,
                cache_hit: false,
            });
        }

        let content_type = response
            .content_type
            .clone()
            .unwrap_or_else(|| infer_content_type(target).to_string());
        self.cache
            .store(target, response.body.clone(), response.content_type.as_deref())
            .await;

        Ok(ProxiedResponse {
            status: response.status,
            body: response.body,
            content_type,
            cache_ttl_secs: ttl,
            cache_hit: false,
        })
    }

    fn host_allowed(&self, target: &str) -> bool {
        let host = match Url::parse(target) {
            Ok(url) => match url.host_str() {
                Some(host) => host.to_string(),
                None => return false,
            },
            Err(_) => return false,
        };
        let bare = host.strip_prefix("www.").unwrap_or(&host);
        self.allow_hosts
            .iter()
            .any(|allowed| allowed == &host || allowed == bare)
    }

    pub fn allow_hosts(&self) -> &[String] {
        &self.allow_hosts
    }
}

/// Content type from the target's extension, used when the cache backend
/// cannot preserve one.
fn infer_content_type(target: &str) -> &'static str {
    let path = target.split(['?', '#']).next().unwrap_or(target);
    match path.rsplit('.').next().map(|e| e.to_ascii_lowercase()).as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        Some("json") => "application/json",
        Some("xml") => "text/xml",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infer_content_type() {
        assert_eq!(infer_content_type("https://x/a/1.png"), "image/png");
        assert_eq!(infer_content_type("https://x/a/1.JPG?time=t"), "image/jpeg");
        assert_eq!(infer_content_type("https://x/a/data"), "application/octet-stream");
    }
}
