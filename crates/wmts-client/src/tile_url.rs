//! Upstream tile URL composition.

use std::sync::Arc;

use crate::grid::TilingGridSelector;

/// Inputs for one tile URL. Grid and extension are optional: the grid is
/// resolved via the selector when absent and the extension defaults to png.
#[derive(Debug, Clone)]
pub struct TileUrlParams<'a> {
    pub layer_id: &'a str,
    pub z: u32,
    pub y: u32,
    pub x: u32,
    pub time: &'a str,
    pub grid: Option<&'a str>,
    pub ext: Option<&'a str>,
}

/// Composes upstream tile URLs against a fixed tile base, e.g.
/// `https://gibs.earthdata.nasa.gov/wmts/epsg3857/best`.
pub struct TileAddressBuilder {
    tile_base: String,
    grids: Arc<TilingGridSelector>,
}

impl TileAddressBuilder {
    pub fn new(tile_base: impl Into<String>, grids: Arc<TilingGridSelector>) -> Self {
        let tile_base = tile_base.into().trim_end_matches('/').to_string();
        Self { tile_base, grids }
    }

    /// Build `{base}/{layer}/default/{time}/{grid}/{z}/{y}/{x}.{ext}` with
    /// the time percent-encoded. Pure given its cached dependencies.
    pub async fn build_url(&self, params: TileUrlParams<'_>) -> String {
        let grid = match params.grid {
            Some(grid) => grid.to_string(),
            None => self.grids.grid(params.layer_id).await,
        };
        let ext = params.ext.unwrap_or("png").to_ascii_lowercase();
        let time = urlencoding::encode(params.time);
        format!(
            "{}/{}/default/{}/{}/{}/{}/{}.{}",
            self.tile_base, params.layer_id, time, grid, params.z, params.y, params.x, ext
        )
    }
}
