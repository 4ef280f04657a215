//! Generic byte cache for proxied upstream responses.
//!
//! Responses are keyed by a deterministic hash of the target URL and stored
//! in a pluggable backend (object storage in production, memory in tests).
//! TTL policy is data, not code: an ordered host/path-prefix rule table
//! resolves how long each target may be cached. Caching is an optimization
//! only — every failure path degrades to a plain miss.

pub mod backend;
pub mod byte_cache;
pub mod key;
pub mod rules;

pub use backend::{CacheBackend, CachedObject, MemoryBackend, ObjectStorageBackend, ObjectStorageConfig};
pub use byte_cache::ByteCache;
pub use key::cache_key;
pub use rules::{CachePolicy, TtlRule};
