//! In-memory TTL caches shared across concurrent requests.
//!
//! Both the single-slot and keyed variants replace entries wholesale on
//! write (last-writer-wins), so a stale read during a concurrent refresh is
//! acceptable and no entry is ever mutated in place. The clock is injected
//! so tests can expire entries without sleeping.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::debug;

/// Time source for TTL decisions.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall-clock time, used everywhere outside tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Manually advanced clock for deterministic TTL tests.
pub struct ManualClock {
    now: Mutex<Instant>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Instant::now()),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().expect("clock lock poisoned");
        *now += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock().expect("clock lock poisoned")
    }
}

struct Entry<V> {
    value: V,
    stored_at: Instant,
}

/// Single-slot TTL cache (one shared value, e.g. a capability document).
pub struct TtlSlot<V> {
    slot: RwLock<Option<Entry<V>>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl<V: Clone> TtlSlot<V> {
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            slot: RwLock::new(None),
            ttl,
            clock,
        }
    }

    /// Get the cached value if still within TTL.
    pub async fn get(&self) -> Option<V> {
        let guard = self.slot.read().await;
        match guard.as_ref() {
            Some(entry) if self.clock.now().duration_since(entry.stored_at) < self.ttl => {
                Some(entry.value.clone())
            }
            Some(_) => {
                debug!("ttl slot expired");
                None
            }
            None => None,
        }
    }

    /// Replace the cached value wholesale.
    pub async fn set(&self, value: V) {
        let mut guard = self.slot.write().await;
        *guard = Some(Entry {
            value,
            stored_at: self.clock.now(),
        });
    }

    /// Drop the cached value.
    pub async fn invalidate(&self) {
        let mut guard = self.slot.write().await;
        *guard = None;
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

/// Keyed TTL cache (per-layer timestamp sets and the like).
///
/// Expired entries are replaced on the next write for their key; there is no
/// background sweeper because the key space (layer identifiers) is small.
pub struct TtlCache<K, V> {
    entries: RwLock<HashMap<K, Entry<V>>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl<K: Eq + Hash + Clone, V: Clone> TtlCache<K, V> {
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
            clock,
        }
    }

    pub async fn get(&self, key: &K) -> Option<V> {
        let guard = self.entries.read().await;
        match guard.get(key) {
            Some(entry) if self.clock.now().duration_since(entry.stored_at) < self.ttl => {
                Some(entry.value.clone())
            }
            _ => None,
        }
    }

    pub async fn insert(&self, key: K, value: V) {
        let mut guard = self.entries.write().await;
        guard.insert(
            key,
            Entry {
                value,
                stored_at: self.clock.now(),
            },
        );
    }

    pub async fn invalidate_all(&self) {
        let mut guard = self.entries.write().await;
        guard.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_slot_hit_within_ttl() {
        let slot = TtlSlot::new(Duration::from_secs(60));
        slot.set("xml".to_string()).await;
        assert_eq!(slot.get().await.as_deref(), Some("xml"));
    }

    #[tokio::test]
    async fn test_slot_miss_when_empty() {
        let slot: TtlSlot<String> = TtlSlot::new(Duration::from_secs(60));
        assert!(slot.get().await.is_none());
    }

    #[tokio::test]
    async fn test_slot_expires_with_manual_clock() {
        let clock = Arc::new(ManualClock::new());
        let slot = TtlSlot::with_clock(Duration::from_secs(60), clock.clone());
        slot.set(1u32).await;
        assert_eq!(slot.get().await, Some(1));

        clock.advance(Duration::from_secs(61));
        assert!(slot.get().await.is_none());
    }

    #[tokio::test]
    async fn test_slot_overwrites_on_set() {
        let slot = TtlSlot::new(Duration::from_secs(60));
        slot.set("first".to_string()).await;
        slot.set("second".to_string()).await;
        assert_eq!(slot.get().await.as_deref(), Some("second"));
    }

    #[tokio::test]
    async fn test_keyed_cache_independent_keys() {
        let cache: TtlCache<String, Vec<String>> = TtlCache::new(Duration::from_secs(60));
        cache.insert("a".into(), vec!["1".into()]).await;
        assert_eq!(cache.get(&"a".to_string()).await, Some(vec!["1".to_string()]));
        assert!(cache.get(&"b".to_string()).await.is_none());
    }

    #[tokio::test]
    async fn test_keyed_cache_expiry() {
        let clock = Arc::new(ManualClock::new());
        let cache: TtlCache<String, u32> =
            TtlCache::with_clock(Duration::from_secs(60), clock.clone());
        cache.insert("k".into(), 7).await;
        clock.advance(Duration::from_secs(61));
        assert!(cache.get(&"k".to_string()).await.is_none());
    }

    #[tokio::test]
    async fn test_keyed_cache_invalidate_all() {
        let cache: TtlCache<String, u32> = TtlCache::new(Duration::from_secs(60));
        cache.insert("k".into(), 7).await;
        cache.invalidate_all().await;
        assert!(cache.get(&"k".to_string()).await.is_none());
    }
}
