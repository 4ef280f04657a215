//! Service configuration from environment variables and a YAML rule file.
//!
//! Malformed configuration is fatal at startup; nothing here is re-read at
//! runtime.

use std::env;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{info, warn};

use tile_cache::{CachePolicy, ObjectStorageConfig, TtlRule};

const DEFAULT_CAPS_URL: &str =
    "https://gibs.earthdata.nasa.gov/wmts/epsg3857/best/wmts.cgi?SERVICE=WMTS&REQUEST=GetCapabilities";
const DEFAULT_TILE_BASE: &str = "https://gibs.earthdata.nasa.gov/wmts/epsg3857/best";
const DEFAULT_ALLOW_HOSTS: &str =
    "gibs.earthdata.nasa.gov,opengeo.ncep.noaa.gov,nomads.ncep.noaa.gov";

/// Complete service configuration.
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    /// WMTS GetCapabilities URL.
    pub capabilities_url: String,
    /// Base path tiles are requested under.
    pub tile_base: String,
    /// Hosts the generic passthrough may reach.
    pub allow_hosts: Vec<String>,
    /// TTL for the raw capability document.
    pub capability_ttl: Duration,
    /// TTL for per-layer timestamp answers.
    pub timestamp_ttl: Duration,
    /// Upstream request timeout.
    pub upstream_timeout: Duration,
    /// Rate-limiter burst capacity.
    pub rate_burst: u32,
    /// Rate-limiter refill per second (0 = pure burst counter).
    pub rate_refill_per_sec: f64,
    /// Cache TTL rules and size guard.
    pub cache_policy: CachePolicy,
    /// Object-storage backend; `None` falls back to the in-memory backend.
    pub object_storage: Option<ObjectStorageConfig>,
}

impl ProxyConfig {
    /// Load configuration from the environment.
    ///
    /// Environment variables mirror the upstream deployment:
    /// `GIBS_CAPS_URL`, `GIBS_TILE_BASE`, `ALLOW_HOSTS`,
    /// `CAPABILITIES_CACHE_TTL_SECS`, `UPSTREAM_TIMEOUT_SECS`,
    /// `GIBS_RATE_BURST`, `GIBS_RATE_REFILL_PER_SEC`, `CACHE_RULES_FILE`,
    /// `S3_BUCKET` (+ `S3_ENDPOINT`, `S3_ACCESS_KEY`, `S3_SECRET_KEY`).
    pub fn from_env() -> Result<Self> {
        let capabilities_url =
            env::var("GIBS_CAPS_URL").unwrap_or_else(|_| DEFAULT_CAPS_URL.to_string());
        let tile_base = env::var("GIBS_TILE_BASE").unwrap_or_else(|_| DEFAULT_TILE_BASE.to_string());

        let allow_hosts = env::var("ALLOW_HOSTS")
            .unwrap_or_else(|_| DEFAULT_ALLOW_HOSTS.to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let capability_ttl = Duration::from_secs(parse_env("CAPABILITIES_CACHE_TTL_SECS", 60)?);
        let timestamp_ttl = Duration::from_secs(parse_env("TIMESTAMP_CACHE_TTL_SECS", 60)?);
        let upstream_timeout = Duration::from_secs(parse_env("UPSTREAM_TIMEOUT_SECS", 30)?);
        let rate_burst = parse_env("GIBS_RATE_BURST", 60u32)?;
        let rate_refill_per_sec = parse_env("GIBS_RATE_REFILL_PER_SEC", 10.0f64)?;

        let cache_policy = match env::var("CACHE_RULES_FILE") {
            Ok(path) => {
                let text = std::fs::read_to_string(&path)
                    .with_context(|| format!("failed to read cache rules file {}", path))?;
                serde_yaml::from_str(&text)
                    .with_context(|| format!("failed to parse cache rules file {}", path))?
            }
            Err(_) => default_cache_policy(),
        };

        let object_storage = match env::var("S3_BUCKET") {
            Ok(bucket) if !bucket.is_empty() => Some(ObjectStorageConfig {
                endpoint: env::var("S3_ENDPOINT")
                    .unwrap_or_else(|_| "http://minio:9000".to_string()),
                bucket,
                access_key_id: env::var("S3_ACCESS_KEY")
                    .unwrap_or_else(|_| "minioadmin".to_string()),
                secret_access_key: env::var("S3_SECRET_KEY")
                    .unwrap_or_else(|_| "minioadmin".to_string()),
                region: env::var("S3_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
                allow_http: true,
            }),
            _ => {
                warn!("S3_BUCKET not set, response cache is in-memory only");
                None
            }
        };

        let config = Self {
            capabilities_url,
            tile_base,
            allow_hosts,
            capability_ttl,
            timestamp_ttl,
            upstream_timeout,
            rate_burst,
            rate_refill_per_sec,
            cache_policy,
            object_storage,
        };
        info!(
            caps_url = %config.capabilities_url,
            allow_hosts = config.allow_hosts.len(),
            rate_burst = config.rate_burst,
            "configuration loaded"
        );
        Ok(config)
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, default: T) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(value) => value
            .parse::<T>()
            .with_context(|| format!("invalid value for {}", name)),
        Err(_) => Ok(default),
    }
}

/// Built-in rule table used when no `CACHE_RULES_FILE` is supplied:
/// timestamped GIBS tiles are short-lived, everything else gets the
/// policy default.
fn default_cache_policy() -> CachePolicy {
    CachePolicy {
        rules: vec![TtlRule {
            host: "gibs.earthdata.nasa.gov".into(),
            path_prefix: "/wmts".into(),
            ttl_secs: 60,
        }],
        ..CachePolicy::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_covers_gibs_tiles() {
        let policy = default_cache_policy();
        assert_eq!(
            policy.ttl_for("https://gibs.earthdata.nasa.gov/wmts/epsg3857/best/L/default/t/g/1/0/0.png"),
            60
        );
        assert_eq!(policy.ttl_for("https://other.example.com/x.png"), 300);
    }

    #[test]
    fn test_parse_env_rejects_garbage() {
        std::env::set_var("TEST_PARSE_ENV_GARBAGE", "not-a-number");
        assert!(parse_env::<u32>("TEST_PARSE_ENV_GARBAGE", 1).is_err());
        std::env::remove_var("TEST_PARSE_ENV_GARBAGE");
    }
}
