//! Application metrics recording.

use metrics::counter;

pub fn record_request(route: &'static str) {
    counter!("proxy_requests_total", "route" => route).increment(1);
}

pub fn record_cache_hit() {
    counter!("proxy_cache_hits_total").increment(1);
}

pub fn record_cache_miss() {
    counter!("proxy_cache_misses_total").increment(1);
}

pub fn record_upstream_fetch() {
    counter!("proxy_upstream_fetches_total").increment(1);
}

pub fn record_rate_limited(route: &'static str) {
    counter!("proxy_rate_limited_total", "route" => route).increment(1);
}
