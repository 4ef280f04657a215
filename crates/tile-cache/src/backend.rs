//! Cache storage backends.
//!
//! The byte cache owns policy; backends only move bytes. Object storage
//! (S3/MinIO) backs production; the memory backend backs tests and
//! single-node deployments without object storage.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use object_store::{aws::AmazonS3Builder, path::Path, ObjectStore};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;

use proxy_common::{ProxyError, ProxyResult};

/// A cached payload with its content type, when the backend can keep one.
#[derive(Debug, Clone)]
pub struct CachedObject {
    pub body: Bytes,
    pub content_type: Option<String>,
}

/// Narrow storage seam for the byte cache.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Fetch a stored object. Absence is `Ok(None)`; backend failures are
    /// errors (the cache treats both as a miss).
    async fn get(&self, key: &str) -> ProxyResult<Option<CachedObject>>;

    /// Store an object, replacing any previous value for the key.
    async fn put(&self, key: &str, body: Bytes, content_type: Option<&str>) -> ProxyResult<()>;
}

/// In-memory backend.
#[derive(Default)]
pub struct MemoryBackend {
    objects: RwLock<HashMap<String, CachedObject>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }
}

#[async_trait]
impl CacheBackend for MemoryBackend {
    async fn get(&self, key: &str) -> ProxyResult<Option<CachedObject>> {
        Ok(self.objects.read().await.get(key).cloned())
    }

    async fn put(&self, key: &str, body: Bytes, content_type: Option<&str>) -> ProxyResult<()> {
        self.objects.write().await.insert(
            key.to_string(),
            CachedObject {
                body,
                content_type: content_type.map(|s| s.to_string()),
            },
        );
        Ok(())
    }
}

/// Configuration for the object-storage backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectStorageConfig {
    /// S3/MinIO endpoint URL
    pub endpoint: String,
    /// Bucket name
    pub bucket: String,
    /// Access key ID
    pub access_key_id: String,
    /// Secret access key
    pub secret_access_key: String,
    /// AWS region (use "us-east-1" for MinIO)
    pub region: String,
    /// Allow HTTP (for local MinIO)
    pub allow_http: bool,
}

impl Default for ObjectStorageConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://minio:9000".to_string(),
            bucket: "tile-cache".to_string(),
            access_key_id: "minioadmin".to_string(),
            secret_access_key: "minioadmin".to_string(),
            region: "us-east-1".to_string(),
            allow_http: true,
        }
    }
}

/// S3/MinIO-backed cache storage.
///
/// The underlying store does not persist content types, so `get` reports
/// `None` for the content type and callers infer one from the target URL.
pub struct ObjectStorageBackend {
    store: Arc<dyn ObjectStore>,
    bucket: String,
}

impl ObjectStorageBackend {
    pub fn new(config: &ObjectStorageConfig) -> ProxyResult<Self> {
        let mut builder = AmazonS3Builder::new()
            .with_endpoint(&config.endpoint)
            .with_bucket_name(&config.bucket)
            .with_access_key_id(&config.access_key_id)
            .with_secret_access_key(&config.secret_access_key)
            .with_region(&config.region);

        if config.allow_http {
            builder = builder.with_allow_http(true);
        }

        let store = builder
            .build()
            .map_err(|e| ProxyError::CacheError(format!("failed to create S3 client: {}", e)))?;

        Ok(Self {
            store: Arc::new(store),
            bucket: config.bucket.clone(),
        })
    }
}

#[async_trait]
impl CacheBackend for ObjectStorageBackend {
    async fn get(&self, key: &str) -> ProxyResult<Option<CachedObject>> {
        let location = Path::from(key);
        match self.store.get(&location).await {
            Ok(result) => {
                let body = result.bytes().await.map_err(|e| {
                    ProxyError::CacheError(format!("failed to read {}: {}", key, e))
                })?;
                debug!(bucket = %self.bucket, key = key, size = body.len(), "cache object read");
                Ok(Some(CachedObject {
                    body,
                    content_type: None,
                }))
            }
            Err(object_store::Error::NotFound { .. }) => Ok(None),
            Err(e) => Err(ProxyError::CacheError(format!(
                "failed to get {}: {}",
                key, e
            ))),
        }
    }

    async fn put(&self, key: &str, body: Bytes, _content_type: Option<&str>) -> ProxyResult<()> {
        let location = Path::from(key);
        debug!(bucket = %self.bucket, key = key, size = body.len(), "writing cache object");
        self.store
            .put(&location, body.into())
            .await
            .map_err(|e| ProxyError::CacheError(format!("failed to put {}: {}", key, e)))?;
        Ok(())
    }
}
