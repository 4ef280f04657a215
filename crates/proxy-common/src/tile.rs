//! Tile request value object.

use serde::{Deserialize, Serialize};

use crate::error::{ProxyError, ProxyResult};

/// A single tile request: layer, zoom/row/column, format extension and an
/// optional explicit timestamp. Constructed per request, never shared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileRequest {
    pub layer: String,
    pub z: u32,
    pub y: u32,
    pub x: u32,
    pub ext: String,
    /// Explicit timestamp from the client; `None` resolves to the layer's
    /// latest available timestamp.
    pub time: Option<String>,
}

impl TileRequest {
    /// Parse raw path segments into a validated request.
    ///
    /// Non-numeric coordinates are a client error, not a panic.
    pub fn parse(
        layer: &str,
        z: &str,
        y: &str,
        x: &str,
        ext: Option<&str>,
        time: Option<&str>,
    ) -> ProxyResult<Self> {
        let z = parse_coord("z", z)?;
        let y = parse_coord("y", y)?;
        let x = parse_coord("x", x)?;
        let ext = ext.unwrap_or("png").to_ascii_lowercase();
        // The WMTS literal "default" means the same as no time at all.
        let time = time
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty() && !t.eq_ignore_ascii_case("default"));
        Ok(Self {
            layer: layer.to_string(),
            z,
            y,
            x,
            ext,
            time,
        })
    }
}

fn parse_coord(name: &str, value: &str) -> ProxyResult<u32> {
    value.parse::<u32>().map_err(|_| {
        ProxyError::InvalidCoordinate(format!("{} must be a non-negative integer, got '{}'", name, value))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid() {
        let req = TileRequest::parse("GOES-East_ABI_GeoColor", "2", "1", "0", Some("png"), None)
            .unwrap();
        assert_eq!(req.z, 2);
        assert_eq!(req.y, 1);
        assert_eq!(req.x, 0);
        assert_eq!(req.ext, "png");
        assert!(req.time.is_none());
    }

    #[test]
    fn test_parse_defaults_extension_to_png() {
        let req = TileRequest::parse("L", "0", "0", "0", None, None).unwrap();
        assert_eq!(req.ext, "png");
    }

    #[test]
    fn test_parse_rejects_non_numeric() {
        let err = TileRequest::parse("L", "two", "1", "0", None, None).unwrap_err();
        assert!(matches!(err, ProxyError::InvalidCoordinate(_)));
        let err = TileRequest::parse("L", "2", "-1", "0", None, None).unwrap_err();
        assert!(matches!(err, ProxyError::InvalidCoordinate(_)));
    }

    #[test]
    fn test_blank_time_treated_as_absent() {
        let req = TileRequest::parse("L", "2", "1", "0", None, Some("  ")).unwrap();
        assert!(req.time.is_none());
    }

    #[test]
    fn test_default_literal_treated_as_absent() {
        let req = TileRequest::parse("L", "2", "1", "0", None, Some("default")).unwrap();
        assert!(req.time.is_none());
    }
}
