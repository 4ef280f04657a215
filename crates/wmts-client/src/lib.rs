//! WMTS capability resolution for time-varying imagery layers.
//!
//! Talks to a GIBS-style WMTS endpoint and answers three questions per
//! layer: which timestamps exist, which one is "latest", and which
//! TileMatrixSet the layer is served against. Also composes upstream tile
//! URLs from the answers. All network access goes through the injected
//! [`HttpFetch`] abstraction so tests never touch the wire.

pub mod capabilities;
pub mod fetch;
pub mod grid;
pub mod parse;
pub mod tile_url;
pub mod timestamps;

pub use capabilities::CapabilityStore;
pub use fetch::{FetchResponse, HttpFetch, ReqwestFetch};
pub use grid::{TilingGridSelector, GRID_DEFAULT, GRID_GOES};
pub use parse::{find_layer, parse_layers, LayerCapability};
pub use tile_url::{TileAddressBuilder, TileUrlParams};
pub use timestamps::TimestampIndex;
