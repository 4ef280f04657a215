//! The byte cache proper: policy over a storage backend.

use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, warn};

use crate::backend::{CacheBackend, CachedObject};
use crate::key::cache_key;
use crate::rules::CachePolicy;

/// Content-addressed response cache with TTL rules and a size guard.
pub struct ByteCache {
    backend: Arc<dyn CacheBackend>,
    policy: CachePolicy,
}

impl ByteCache {
    pub fn new(backend: Arc<dyn CacheBackend>, policy: CachePolicy) -> Self {
        Self { backend, policy }
    }

    /// Look up the cached response for a target URL.
    ///
    /// Object absence and backend failure both come back as a miss — the
    /// distinction is logged here and not surfaced to callers.
    pub async fn lookup(&self, target: &str) -> Option<CachedObject> {
        let key = cache_key(target);
        match self.backend.get(&key).await {
            Ok(Some(obj)) => {
                debug!(target = target, key = %key, size = obj.body.len(), "cache hit");
                Some(obj)
            }
            Ok(None) => {
                debug!(target = target, key = %key, "cache miss");
                None
            }
            Err(e) => {
                warn!(target = target, error = %e, "cache lookup failed, treating as miss");
                None
            }
        }
    }

    /// Store a response for a target URL, subject to the size guard.
    ///
    /// Oversized payloads are skipped (logged, not an error) — the caller
    /// still serves them to the client. Backend failures are likewise
    /// recovered locally; caching is never a correctness dependency.
    /// Returns whether the object was persisted.
    pub async fn store(&self, target: &str, body: Bytes, content_type: Option<&str>) -> bool {
        if !self.policy.within_size_guard(body.len()) {
            warn!(
                target = target,
                size = body.len(),
                max = self.policy.max_object_bytes,
                "payload exceeds size guard, not cached"
            );
            return false;
        }

        let key = cache_key(target);
        match self.backend.put(&key, body, content_type).await {
            Ok(()) => true,
            Err(e) => {
                warn!(target = target, error = %e, "cache store failed, continuing uncached");
                false
            }
        }
    }

    /// TTL in seconds the response for this target may be cached for,
    /// per the configured rule table.
    pub fn ttl_for(&self, target: &str) -> u64 {
        self.policy.ttl_for(target)
    }
}
