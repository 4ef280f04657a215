//! Tile proxy service library.
//!
//! Resolves time-varying WMTS imagery through a caching, rate-limited
//! proxy. The HTTP layer in [`handlers`] is a thin adapter; all request
//! semantics live in [`gateway`] and the library crates underneath it.

pub mod config;
pub mod gateway;
pub mod handlers;
pub mod metrics;
pub mod rate_limit;
pub mod state;

pub use config::ProxyConfig;
pub use gateway::{ProxyGateway, ProxiedResponse};
pub use rate_limit::RateLimiter;
pub use state::AppState;
