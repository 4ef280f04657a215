//! Structured capability document parsing.
//!
//! Walks the GetCapabilities XML with quick-xml events instead of regex
//! scraping, extracting per layer: identifier, title, the time dimension's
//! raw value strings and declared default, and TileMatrixSetLink targets.
//! Namespace prefixes (`ows:` etc.) are ignored; only local names matter.
//!
//! The time dimension is recognized either by a `name="time"` attribute or
//! by an `<Identifier>time</Identifier>` child, matching the variants GIBS
//! actually emits.

use quick_xml::events::Event;
use quick_xml::Reader;

use proxy_common::{ProxyError, ProxyResult};

/// Everything this proxy needs to know about one `<Layer>` block.
#[derive(Debug, Clone, Default)]
pub struct LayerCapability {
    pub identifier: String,
    pub title: String,
    /// Raw time-dimension value strings, unsplit (token splitting and ISO
    /// filtering happen in the timestamp index).
    pub time_values: Vec<String>,
    /// Declared `<Default>` of the time dimension, verbatim.
    pub time_default: Option<String>,
    /// TileMatrixSet names in document order.
    pub tile_matrix_sets: Vec<String>,
}

#[derive(Debug, Default)]
struct DimensionScan {
    is_time: bool,
    values: Vec<String>,
    default: Option<String>,
}

fn local_name(qname: &[u8]) -> String {
    let name = match qname.iter().rposition(|&b| b == b':') {
        Some(idx) => &qname[idx + 1..],
        None => qname,
    };
    String::from_utf8_lossy(name).into_owned()
}

/// Parse all `<Layer>` blocks out of a capability document.
///
/// Malformed XML is a parse error; an empty or layer-less document is not.
pub fn parse_layers(xml: &str) -> ProxyResult<Vec<LayerCapability>> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut layers = Vec::new();
    let mut layer: Option<LayerCapability> = None;
    let mut dimension: Option<DimensionScan> = None;
    let mut path: Vec<String> = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = local_name(e.name().as_ref());
                match name.as_str() {
                    "Layer" => layer = Some(LayerCapability::default()),
                    "Dimension" if layer.is_some() => {
                        let mut scan = DimensionScan::default();
                        for attr in e.attributes().flatten() {
                            if attr.key.as_ref() == b"name" {
                                let value = attr
                                    .unescape_value()
                                    .map_err(|e| ProxyError::CapabilityParse(e.to_string()))?;
                                scan.is_time = value.eq_ignore_ascii_case("time");
                            }
                        }
                        dimension = Some(scan);
                    }
                    _ => {}
                }
                path.push(name);
            }
            Ok(Event::Text(t)) => {
                let text = t
                    .unescape()
                    .map_err(|e| ProxyError::CapabilityParse(e.to_string()))?
                    .trim()
                    .to_string();
                if text.is_empty() {
                    continue;
                }
                let element = path.last().map(String::as_str).unwrap_or("");
                let parent = path
                    .len()
                    .checked_sub(2)
                    .and_then(|i| path.get(i))
                    .map(String::as_str)
                    .unwrap_or("");

                match (parent, element) {
                    ("Layer", "Identifier") => {
                        if let Some(l) = layer.as_mut() {
                            l.identifier = text;
                        }
                    }
                    ("Layer", "Title") => {
                        if let Some(l) = layer.as_mut() {
                            l.title = text;
                        }
                    }
                    ("Dimension", "Identifier") => {
                        if let Some(d) = dimension.as_mut() {
                            if text.eq_ignore_ascii_case("time") {
                                d.is_time = true;
                            }
                        }
                    }
                    ("Dimension", "Value") => {
                        if let Some(d) = dimension.as_mut() {
                            d.values.push(text);
                        }
                    }
                    ("Dimension", "Default") => {
                        if let Some(d) = dimension.as_mut() {
                            d.default = Some(text);
                        }
                    }
                    ("TileMatrixSetLink", "TileMatrixSet") => {
                        if let Some(l) = layer.as_mut() {
                            l.tile_matrix_sets.push(text);
                        }
                    }
                    // Dimension value given as direct element text, e.g.
                    // <Dimension name="time">A B</Dimension>
                    (_, "Dimension") => {
                        if let Some(d) = dimension.as_mut() {
                            d.values.push(text);
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::End(e)) => {
                let name = local_name(e.name().as_ref());
                path.pop();
                match name.as_str() {
                    "Dimension" => {
                        if let (Some(l), Some(d)) = (layer.as_mut(), dimension.take()) {
                            if d.is_time {
                                l.time_values.extend(d.values);
                                if l.time_default.is_none() {
                                    l.time_default = d.default;
                                }
                            }
                        }
                    }
                    "Layer" => {
                        if let Some(l) = layer.take() {
                            layers.push(l);
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(ProxyError::CapabilityParse(e.to_string())),
            _ => {}
        }
    }

    Ok(layers)
}

/// Locate a layer by identifier (exact, case-insensitive), falling back to
/// title since older GIBS documents identify layers by `<ows:Title>` only.
pub fn find_layer<'a>(layers: &'a [LayerCapability], layer_id: &str) -> Option<&'a LayerCapability> {
    layers
        .iter()
        .find(|l| l.identifier.eq_ignore_ascii_case(layer_id))
        .or_else(|| layers.iter().find(|l| l.title.eq_ignore_ascii_case(layer_id)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const CAPS: &str = r#"<?xml version="1.0"?>
<Capabilities xmlns:ows="http://www.opengis.net/ows/1.1">
  <Contents>
    <Layer>
      <ows:Title>GOES-East ABI GeoColor</ows:Title>
      <ows:Identifier>GOES-East_ABI_GeoColor</ows:Identifier>
      <Dimension>
        <ows:Identifier>Time</ows:Identifier>
        <Default>2025-08-24T19:00:00Z</Default>
        <Value>2025-08-24T18:00:00Z</Value>
        <Value>2025-08-24T19:00:00Z</Value>
      </Dimension>
      <TileMatrixSetLink>
        <TileMatrixSet>GoogleMapsCompatible_Level8</TileMatrixSet>
      </TileMatrixSetLink>
    </Layer>
    <Layer>
      <ows:Identifier>MODIS_Terra_CorrectedReflectance_TrueColor</ows:Identifier>
      <Dimension name="time">2025-08-22T00:00:00Z,2025-08-23T00:00:00Z</Dimension>
      <TileMatrixSetLink>
        <TileMatrixSet>GoogleMapsCompatible_Level9</TileMatrixSet>
      </TileMatrixSetLink>
    </Layer>
  </Contents>
</Capabilities>"#;

    #[test]
    fn test_parses_identifier_and_title() {
        let layers = parse_layers(CAPS).unwrap();
        assert_eq!(layers.len(), 2);
        assert_eq!(layers[0].identifier, "GOES-East_ABI_GeoColor");
        assert_eq!(layers[0].title, "GOES-East ABI GeoColor");
    }

    #[test]
    fn test_time_dimension_via_identifier_child() {
        let layers = parse_layers(CAPS).unwrap();
        assert_eq!(
            layers[0].time_values,
            vec!["2025-08-24T18:00:00Z", "2025-08-24T19:00:00Z"]
        );
        assert_eq!(
            layers[0].time_default.as_deref(),
            Some("2025-08-24T19:00:00Z")
        );
    }

    #[test]
    fn test_time_dimension_via_name_attribute_direct_text() {
        let layers = parse_layers(CAPS).unwrap();
        assert_eq!(
            layers[1].time_values,
            vec!["2025-08-22T00:00:00Z,2025-08-23T00:00:00Z"]
        );
        assert!(layers[1].time_default.is_none());
    }

    #[test]
    fn test_tile_matrix_set_links() {
        let layers = parse_layers(CAPS).unwrap();
        assert_eq!(layers[0].tile_matrix_sets, vec!["GoogleMapsCompatible_Level8"]);
        assert_eq!(layers[1].tile_matrix_sets, vec!["GoogleMapsCompatible_Level9"]);
    }

    #[test]
    fn test_non_time_dimension_ignored() {
        let xml = r#"<Capabilities><Contents><Layer>
            <Identifier>L</Identifier>
            <Dimension name="elevation"><Value>500</Value></Dimension>
        </Layer></Contents></Capabilities>"#;
        let layers = parse_layers(xml).unwrap();
        assert!(layers[0].time_values.is_empty());
    }

    #[test]
    fn test_find_layer_case_insensitive_identifier_then_title() {
        let layers = parse_layers(CAPS).unwrap();
        assert!(find_layer(&layers, "goes-east_abi_geocolor").is_some());
        assert!(find_layer(&layers, "GOES-East ABI GeoColor").is_some());
        assert!(find_layer(&layers, "Unknown_Layer").is_none());
    }

    #[test]
    fn test_empty_document_yields_no_layers() {
        let layers = parse_layers("<Capabilities></Capabilities>").unwrap();
        assert!(layers.is_empty());
    }

    #[test]
    fn test_malformed_xml_is_error() {
        assert!(parse_layers("<Capabilities><Layer>").is_err() || parse_layers("<a><b></a>").is_err());
    }
}
