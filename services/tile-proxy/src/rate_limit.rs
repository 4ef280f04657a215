//! Token-bucket admission control for upstream-facing routes.

use std::collections::HashMap;
use std::time::Instant;

use tokio::sync::Mutex;
use tracing::debug;

/// One bucket per rate-limited route key. State is mutated only under the
/// limiter's lock, so concurrent admits against the same key can never
/// double-spend tokens.
#[derive(Debug)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

impl Bucket {
    /// Add `elapsed_secs * rate` tokens, capped at capacity.
    fn refill(&mut self, elapsed_secs: f64, rate: f64, capacity: f64) {
        self.tokens = (self.tokens + elapsed_secs * rate).min(capacity);
    }
}

/// Token-bucket rate limiter.
///
/// Burst capacity and refill rate are injected from configuration. A
/// refill rate of zero is a valid configuration: the bucket becomes a
/// fixed-size burst counter that never refills, which deterministic tests
/// rely on.
pub struct RateLimiter {
    buckets: Mutex<HashMap<String, Bucket>>,
    capacity: f64,
    refill_per_sec: f64,
}

impl RateLimiter {
    pub fn new(burst: u32, refill_per_sec: f64) -> Self {
        Self {
            buckets: Mutex::new(HashMap::new()),
            capacity: burst as f64,
            refill_per_sec,
        }
    }

    /// Check admission for one request against the bucket for `key`.
    /// Consumes one token on success.
    pub async fn admit(&self, key: &str) -> bool {
        let mut buckets = self.buckets.lock().await;
        let now = Instant::now();
        let bucket = buckets.entry(key.to_string()).or_insert_with(|| Bucket {
            tokens: self.capacity,
            last_refill: now,
        });

        let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
        bucket.refill(elapsed, self.refill_per_sec, self.capacity);
        bucket.last_refill = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            debug!(key = key, "rate limit exceeded");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_pure_burst_admits_exactly_capacity() {
        let limiter = RateLimiter::new(2, 0.0);
        assert!(limiter.admit("tile").await);
        assert!(limiter.admit("tile").await);
        assert!(!limiter.admit("tile").await);
        assert!(!limiter.admit("tile").await);
    }

    #[tokio::test]
    async fn test_buckets_are_per_key() {
        let limiter = RateLimiter::new(1, 0.0);
        assert!(limiter.admit("tile").await);
        assert!(!limiter.admit("tile").await);
        // A different route key has its own bucket.
        assert!(limiter.admit("proxy").await);
    }

    #[tokio::test]
    async fn test_concurrent_admits_never_overspend() {
        use std::sync::Arc;

        let limiter = Arc::new(RateLimiter::new(5, 0.0));
        let mut handles = Vec::new();
        for _ in 0..20 {
            let limiter = Arc::clone(&limiter);
            handles.push(tokio::spawn(async move { limiter.admit("tile").await }));
        }

        let mut admitted = 0;
        for handle in handles {
            if handle.await.unwrap() {
                admitted += 1;
            }
        }
        assert_eq!(admitted, 5);
    }

    #[test]
    fn test_refill_is_capped_at_capacity() {
        let mut bucket = Bucket {
            tokens: 0.0,
            last_refill: Instant::now(),
        };
        bucket.refill(2.0, 3.0, 4.0);
        assert_eq!(bucket.tokens, 4.0);

        bucket.tokens = 1.0;
        bucket.refill(0.5, 2.0, 4.0);
        assert_eq!(bucket.tokens, 2.0);
    }

    #[test]
    fn test_zero_rate_never_refills() {
        let mut bucket = Bucket {
            tokens: 0.0,
            last_refill: Instant::now(),
        };
        bucket.refill(1_000_000.0, 0.0, 4.0);
        assert_eq!(bucket.tokens, 0.0);
    }
}
