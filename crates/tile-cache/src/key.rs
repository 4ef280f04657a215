//! Cache key derivation.

/// Deterministic cache key for a target URL.
///
/// CRC32 over the URL plus its length, hex-encoded. Not cryptographic;
/// a collision serves a wrong-but-cacheable tile until its TTL lapses.
pub fn cache_key(url: &str) -> String {
    format!(
        "proxy/{:08x}{:08x}",
        crc32fast::hash(url.as_bytes()),
        url.len() as u32
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic() {
        let a = cache_key("https://example.com/tiles/1/2/3.png");
        let b = cache_key("https://example.com/tiles/1/2/3.png");
        assert_eq!(a, b);
    }

    #[test]
    fn test_distinct_urls_distinct_keys() {
        let a = cache_key("https://example.com/tiles/1/2/3.png");
        let b = cache_key("https://example.com/tiles/1/2/4.png");
        assert_ne!(a, b);
    }

    #[test]
    fn test_key_is_a_flat_object_path() {
        let key = cache_key("https://example.com/a?b=c&d=e");
        assert!(key.starts_with("proxy/"));
        assert!(!key[6..].contains('/'));
    }
}
