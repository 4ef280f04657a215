//! Time token handling for WMTS time dimensions.
//!
//! GIBS capability documents list time values either as discrete instants
//! (`2025-08-24T18:00:00Z`) or as intervals (`start/end/period`). Only
//! second-precision UTC instants are accepted; interval periods are never
//! expanded into intermediate instants.

use chrono::NaiveDateTime;

/// Strict ISO-8601-second UTC check: `YYYY-MM-DDTHH:MM:SSZ`, nothing else.
///
/// Lexicographic ordering of strings in this fixed-width format is
/// chronologically correct, which the timestamp index relies on.
pub fn is_iso_second_utc(s: &str) -> bool {
    if s.len() != 20 {
        return false;
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%SZ").is_ok()
}

/// Split a raw time-dimension value list into candidate timestamp tokens.
///
/// Tokens are separated by whitespace and/or commas. A token containing `/`
/// is a `start/end/period` interval: start and end become candidates, the
/// period is ignored. Invalid tokens are dropped silently.
pub fn split_time_tokens(raw: &str) -> Vec<String> {
    let mut out = Vec::new();
    for token in raw.split([' ', '\t', '\n', '\r', ',']) {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        if token.contains('/') {
            let mut parts = token.splitn(3, '/');
            if let Some(start) = parts.next() {
                if is_iso_second_utc(start) {
                    out.push(start.to_string());
                }
            }
            if let Some(end) = parts.next() {
                if is_iso_second_utc(end) {
                    out.push(end.to_string());
                }
            }
        } else if is_iso_second_utc(token) {
            out.push(token.to_string());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_strict_iso_second() {
        assert!(is_iso_second_utc("2025-08-24T18:00:00Z"));
        assert!(is_iso_second_utc("2024-02-29T23:59:59Z"));
    }

    #[test]
    fn test_rejects_loose_formats() {
        assert!(!is_iso_second_utc("2025-08-24"));
        assert!(!is_iso_second_utc("2025-08-24T18:00Z"));
        assert!(!is_iso_second_utc("2025-08-24T18:00:00"));
        assert!(!is_iso_second_utc("2025-08-24T18:00:00.000Z"));
        assert!(!is_iso_second_utc("2025-08-24 18:00:00Z"));
        assert!(!is_iso_second_utc("2025-13-24T18:00:00Z"));
        assert!(!is_iso_second_utc("not-a-time"));
    }

    #[test]
    fn test_split_on_whitespace_and_commas() {
        let tokens = split_time_tokens(
            "2025-08-22T15:00:00Z,2025-08-22T16:00:00Z 2025-08-22T17:00:00Z",
        );
        assert_eq!(
            tokens,
            vec![
                "2025-08-22T15:00:00Z",
                "2025-08-22T16:00:00Z",
                "2025-08-22T17:00:00Z"
            ]
        );
    }

    #[test]
    fn test_interval_keeps_start_and_end_only() {
        let tokens =
            split_time_tokens("2025-08-01T00:00:00Z/2025-08-31T00:00:00Z/PT10M");
        assert_eq!(
            tokens,
            vec!["2025-08-01T00:00:00Z", "2025-08-31T00:00:00Z"]
        );
    }

    #[test]
    fn test_invalid_tokens_dropped() {
        let tokens = split_time_tokens("garbage 2025-08-24T18:00:00Z 2025-08-24");
        assert_eq!(tokens, vec!["2025-08-24T18:00:00Z"]);
    }

    #[test]
    fn test_empty_input() {
        assert!(split_time_tokens("").is_empty());
        assert!(split_time_tokens("  , ,\n").is_empty());
    }
}
