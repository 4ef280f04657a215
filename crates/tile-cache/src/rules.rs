//! TTL rule table and cache policy configuration.
//!
//! Supplied as configuration data (YAML), never hardcoded per route.

use serde::{Deserialize, Serialize};
use url::Url;

/// One TTL rule: exact host match plus path-prefix match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TtlRule {
    pub host: String,
    #[serde(default)]
    pub path_prefix: String,
    pub ttl_secs: u64,
}

/// Ordered rule table with a default TTL and a maximum-object-size guard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachePolicy {
    /// First matching rule wins.
    #[serde(default)]
    pub rules: Vec<TtlRule>,
    #[serde(default = "default_ttl_secs")]
    pub default_ttl_secs: u64,
    #[serde(default = "default_max_object_bytes")]
    pub max_object_bytes: usize,
}

fn default_ttl_secs() -> u64 {
    300
}

fn default_max_object_bytes() -> usize {
    // Tiles are small; anything past 8 MiB is not worth persisting.
    8 * 1024 * 1024
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            rules: Vec::new(),
            default_ttl_secs: default_ttl_secs(),
            max_object_bytes: default_max_object_bytes(),
        }
    }
}

impl CachePolicy {
    /// Resolve the TTL for a target URL: first rule whose host matches
    /// exactly and whose path prefix matches wins; unmatched (or
    /// unparseable) targets get the default.
    pub fn ttl_for(&self, target: &str) -> u64 {
        let parsed = match Url::parse(target) {
            Ok(url) => url,
            Err(_) => return self.default_ttl_secs,
        };
        let host = parsed.host_str().unwrap_or("");
        let path = parsed.path();

        for rule in &self.rules {
            if rule.host == host && path.starts_with(&rule.path_prefix) {
                return rule.ttl_secs;
            }
        }
        self.default_ttl_secs
    }

    /// Whether a payload of this size may be persisted.
    pub fn within_size_guard(&self, len: usize) -> bool {
        len <= self.max_object_bytes
    }
}
