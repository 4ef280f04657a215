//! HTTP fetch abstraction.
//!
//! Capability and tile fetches go through this trait so the stores and the
//! gateway receive their network client by constructor injection. Tests
//! implement the trait directly instead of swapping a global client.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use proxy_common::{ProxyError, ProxyResult};

/// A completed upstream response. The body is fully buffered; tiles and
/// capability documents are both small enough that streaming buys nothing.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Bytes,
}

impl FetchResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Minimal GET-only fetch seam.
#[async_trait]
pub trait HttpFetch: Send + Sync {
    /// Perform a GET. Transport-level failures (DNS, connect, timeout)
    /// are errors; HTTP error statuses are successful fetches whose
    /// status the caller inspects.
    async fn get(&self, url: &str) -> ProxyResult<FetchResponse>;
}

/// Production fetcher backed by a shared reqwest client.
pub struct ReqwestFetch {
    client: reqwest::Client,
}

impl ReqwestFetch {
    /// Build a client with bounded request and connect timeouts so no
    /// upstream fetch can hang a request indefinitely.
    pub fn new(request_timeout: Duration) -> ProxyResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ProxyError::Internal(format!("failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpFetch for ReqwestFetch {
    async fn get(&self, url: &str) -> ProxyResult<FetchResponse> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ProxyError::UpstreamFetch {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let body = response
            .bytes()
            .await
            .map_err(|e| ProxyError::UpstreamFetch {
                url: url.to_string(),
                message: format!("error reading response body: {}", e),
            })?;

        Ok(FetchResponse {
            status,
            content_type,
            body,
        })
    }
}
