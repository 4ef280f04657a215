//! Common types and utilities shared across all gibs-tile-proxy crates.

pub mod error;
pub mod tile;
pub mod time;
pub mod ttl_cache;

pub use error::{ProxyError, ProxyResult};
pub use tile::TileRequest;
pub use time::{is_iso_second_utc, split_time_tokens};
pub use ttl_cache::{Clock, ManualClock, SystemClock, TtlCache, TtlSlot};
