//! Per-layer timestamp extraction and "latest" resolution.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use proxy_common::time::{is_iso_second_utc, split_time_tokens};
use proxy_common::{Clock, ProxyResult, TtlCache};

use crate::capabilities::CapabilityStore;
use crate::parse::{find_layer, parse_layers};

/// Resolves the ordered timestamp set and the latest timestamp for a layer.
///
/// The two answers are cached independently: the plain set is a straight
/// extraction, while "latest" prefers the dimension's declared default and
/// must never silently reuse the set cache.
pub struct TimestampIndex {
    store: Arc<CapabilityStore>,
    sets: TtlCache<String, Arc<Vec<String>>>,
    latest: TtlCache<String, Option<String>>,
}

impl TimestampIndex {
    pub fn new(store: Arc<CapabilityStore>, ttl: Duration) -> Self {
        Self {
            store,
            sets: TtlCache::new(ttl),
            latest: TtlCache::new(ttl),
        }
    }

    pub fn with_clock(store: Arc<CapabilityStore>, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            sets: TtlCache::with_clock(ttl, Arc::clone(&clock)),
            latest: TtlCache::with_clock(ttl, clock),
        }
    }

    /// Ordered, duplicate-free ISO timestamps for a layer.
    ///
    /// Unknown layers yield an empty set, not an error; the empty answer is
    /// cached like any other so a hot unknown layer cannot hammer the
    /// capability parser.
    pub async fn timestamps(&self, layer_id: &str) -> ProxyResult<Arc<Vec<String>>> {
        if let Some(cached) = self.sets.get(&layer_id.to_string()).await {
            return Ok(cached);
        }

        let xml = self.store.get().await?;
        let layers = parse_layers(&xml)?;

        let mut unique = BTreeSet::new();
        if let Some(layer) = find_layer(&layers, layer_id) {
            for raw in &layer.time_values {
                for token in split_time_tokens(raw) {
                    unique.insert(token);
                }
            }
        } else {
            debug!(layer = layer_id, "layer not present in capability document");
        }

        // BTreeSet iteration is lexicographic, which is chronological for
        // the fixed-width ISO-second format.
        let times = Arc::new(unique.into_iter().collect::<Vec<_>>());
        self.sets.insert(layer_id.to_string(), Arc::clone(&times)).await;
        Ok(times)
    }

    /// Latest timestamp for a layer: the declared time-dimension default
    /// when it parses as a valid ISO instant (it may legitimately fall
    /// outside the enumerated set), else the maximum of [`Self::timestamps`],
    /// else `None`.
    pub async fn latest(&self, layer_id: &str) -> ProxyResult<Option<String>> {
        if let Some(cached) = self.latest.get(&layer_id.to_string()).await {
            return Ok(cached);
        }

        let xml = self.store.get().await?;
        let layers = parse_layers(&xml)?;

        let declared_default = find_layer(&layers, layer_id)
            .and_then(|l| l.time_default.clone())
            .filter(|d| is_iso_second_utc(d));

        let resolved = match declared_default {
            Some(default) => Some(default),
            None => self.timestamps(layer_id).await?.last().cloned(),
        };

        self.latest
            .insert(layer_id.to_string(), resolved.clone())
            .await;
        Ok(resolved)
    }

    /// Drop all per-layer answers (the capability store is invalidated
    /// separately by its own TTL).
    pub async fn invalidate_all(&self) {
        self.sets.invalidate_all().await;
        self.latest.invalidate_all().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::fetch::{FetchResponse, HttpFetch};

    struct XmlFetch {
        xml: String,
        calls: AtomicUsize,
    }

    impl XmlFetch {
        fn new(xml: &str) -> Arc<Self> {
            Arc::new(Self {
                xml: xml.to_string(),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl HttpFetch for XmlFetch {
        async fn get(&self, _url: &str) -> ProxyResult<FetchResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(FetchResponse {
                status: 200,
                content_type: Some("text/xml".into()),
                body: Bytes::from(self.xml.clone()),
            })
        }
    }

    fn index_for(xml: &str) -> TimestampIndex {
        let fetch = XmlFetch::new(xml);
        let store = Arc::new(CapabilityStore::new(
            "http://caps",
            fetch,
            Duration::from_secs(60),
        ));
        TimestampIndex::new(store, Duration::from_secs(60))
    }

    const GOES_CAPS: &str = r#"<Capabilities><Contents>
        <Layer>
          <Title>GOES-East_ABI_GeoColor</Title>
          <Dimension name="time"><Value>2025-08-24T18:00:00Z 2025-08-24T19:00:00Z</Value></Dimension>
        </Layer>
      </Contents></Capabilities>"#;

    #[tokio::test]
    async fn test_goes_scenario_timestamps_and_latest() {
        let index = index_for(GOES_CAPS);
        let ts = index.timestamps("GOES-East_ABI_GeoColor").await.unwrap();
        assert_eq!(
            *ts,
            vec!["2025-08-24T18:00:00Z", "2025-08-24T19:00:00Z"]
        );
        assert_eq!(
            index.latest("GOES-East_ABI_GeoColor").await.unwrap().as_deref(),
            Some("2025-08-24T19:00:00Z")
        );
    }

    #[tokio::test]
    async fn test_sorted_deduplicated_strictly_ascending() {
        let index = index_for(
            r#"<Capabilities><Contents><Layer>
              <Identifier>L</Identifier>
              <Dimension name="time">2025-08-24T19:00:00Z 2025-08-24T18:00:00Z,2025-08-24T19:00:00Z junk</Dimension>
            </Layer></Contents></Capabilities>"#,
        );
        let ts = index.timestamps("L").await.unwrap();
        assert_eq!(*ts, vec!["2025-08-24T18:00:00Z", "2025-08-24T19:00:00Z"]);
        for pair in ts.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }

    #[tokio::test]
    async fn test_interval_tokens_keep_start_and_end() {
        let index = index_for(
            r#"<Capabilities><Contents><Layer>
              <Identifier>L</Identifier>
              <Dimension name="time">2025-08-01T00:00:00Z/2025-08-31T00:00:00Z/PT10M</Dimension>
            </Layer></Contents></Capabilities>"#,
        );
        let ts = index.timestamps("L").await.unwrap();
        assert_eq!(*ts, vec!["2025-08-01T00:00:00Z", "2025-08-31T00:00:00Z"]);
    }

    #[tokio::test]
    async fn test_unknown_layer_is_empty_not_error() {
        let index = index_for(GOES_CAPS);
        let ts = index.timestamps("Nope").await.unwrap();
        assert!(ts.is_empty());
        assert!(index.latest("Nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_latest_prefers_declared_default_even_outside_set() {
        let index = index_for(
            r#"<Capabilities><Contents><Layer>
              <Identifier>L</Identifier>
              <Dimension>
                <Identifier>time</Identifier>
                <Default>2025-09-01T00:00:00Z</Default>
                <Value>2025-08-24T18:00:00Z</Value>
              </Dimension>
            </Layer></Contents></Capabilities>"#,
        );
        assert_eq!(
            index.latest("L").await.unwrap().as_deref(),
            Some("2025-09-01T00:00:00Z")
        );
        // The plain set is unaffected by the default.
        let ts = index.timestamps("L").await.unwrap();
        assert_eq!(*ts, vec!["2025-08-24T18:00:00Z"]);
    }

    #[tokio::test]
    async fn test_invalid_default_falls_back_to_max() {
        let index = index_for(
            r#"<Capabilities><Contents><Layer>
              <Identifier>L</Identifier>
              <Dimension>
                <Identifier>time</Identifier>
                <Default>current</Default>
                <Value>2025-08-24T18:00:00Z 2025-08-24T19:00:00Z</Value>
              </Dimension>
            </Layer></Contents></Capabilities>"#,
        );
        assert_eq!(
            index.latest("L").await.unwrap().as_deref(),
            Some("2025-08-24T19:00:00Z")
        );
    }

    #[tokio::test]
    async fn test_results_cached_per_layer() {
        let fetch = XmlFetch::new(GOES_CAPS);
        let store = Arc::new(CapabilityStore::new(
            "http://caps",
            Arc::clone(&fetch) as Arc<dyn HttpFetch>,
            Duration::from_secs(60),
        ));
        let index = TimestampIndex::new(store, Duration::from_secs(60));

        index.timestamps("GOES-East_ABI_GeoColor").await.unwrap();
        index.timestamps("GOES-East_ABI_GeoColor").await.unwrap();
        // One capability fetch regardless of repeat lookups.
        assert_eq!(fetch.calls.load(Ordering::SeqCst), 1);
    }
}
