//! HTTP handlers: a thin axum adapter over the gateway.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Extension, Path, Query},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Deserialize;
use serde_json::json;

use proxy_common::{ProxyError, TileRequest};

use crate::gateway::ProxiedResponse;
use crate::metrics;
use crate::state::AppState;

/// Build the service router. The Prometheus handle is layered in by main;
/// handler tests run without it.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/healthz", get(healthz_handler))
        .route("/version", get(version_handler))
        .route("/metrics", get(metrics_handler))
        .route("/api/timestamps", get(timestamps_handler))
        .route("/api/tiles/:layer/:z/:y/:x", get(tile_handler))
        .route("/proxy", get(proxy_handler))
        .layer(Extension(state))
}

pub async fn health_handler() -> Json<serde_json::Value> {
    Json(json!({ "ok": true }))
}

pub async fn healthz_handler(Extension(state): Extension<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "upstreams": state.gateway.allow_hosts(),
    }))
}

pub async fn version_handler() -> Json<serde_json::Value> {
    Json(json!({ "version": env!("CARGO_PKG_VERSION") }))
}

pub async fn metrics_handler(handle: Option<Extension<PrometheusHandle>>) -> Response {
    match handle {
        Some(Extension(handle)) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => StatusCode::SERVICE_UNAVAILABLE.into_response(),
    }
}

#[derive(Debug, Deserialize)]
pub struct TimestampsQuery {
    pub layer: Option<String>,
}

/// `GET /api/timestamps?layer=<id>` — the timestamp set and latest value
/// for one layer.
pub async fn timestamps_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(query): Query<TimestampsQuery>,
) -> Response {
    metrics::record_request("timestamps");

    let layer = match query.layer.as_deref().map(str::trim).filter(|l| !l.is_empty()) {
        Some(layer) => layer.to_string(),
        None => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "missing_layer_parameter" })),
            )
                .into_response()
        }
    };

    let timestamps = match state.timestamps.timestamps(&layer).await {
        Ok(ts) => ts,
        Err(e) => return error_response(&e),
    };
    let latest = match state.timestamps.latest(&layer).await {
        Ok(latest) => latest,
        Err(e) => return error_response(&e),
    };

    (
        [(header::CACHE_CONTROL, "public, max-age=60")],
        Json(json!({
            "layer": layer,
            "latest": latest,
            "count": timestamps.len(),
            "timestamps": *timestamps,
        })),
    )
        .into_response()
}

#[derive(Debug, Deserialize)]
pub struct TileQuery {
    pub time: Option<String>,
}

/// `GET /api/tiles/:layer/:z/:y/:x.:ext?time=<iso>` — one tile.
pub async fn tile_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path((layer, z, y, x_ext)): Path<(String, String, String, String)>,
    Query(query): Query<TileQuery>,
) -> Response {
    metrics::record_request("tile");

    // The final path segment carries the extension: "0.png".
    let (x, ext) = match x_ext.rsplit_once('.') {
        Some((x, ext)) => (x.to_string(), Some(ext.to_string())),
        None => (x_ext, None),
    };

    let request = match TileRequest::parse(&layer, &z, &y, &x, ext.as_deref(), query.time.as_deref())
    {
        Ok(request) => request,
        Err(e) => return error_response(&e),
    };

    match state.gateway.tile(&request).await {
        Ok(proxied) => proxied_response(proxied),
        Err(e) => error_response(&e),
    }
}

#[derive(Debug, Deserialize)]
pub struct ProxyQuery {
    pub url: Option<String>,
}

/// `GET /proxy?url=<target>` — generic allowlisted passthrough.
pub async fn proxy_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(query): Query<ProxyQuery>,
) -> Response {
    metrics::record_request("proxy");

    let target = match query.url.as_deref().filter(|u| !u.is_empty()) {
        Some(target) => target.to_string(),
        None => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "missing_url_parameter" })),
            )
                .into_response()
        }
    };

    match state.gateway.passthrough(&target).await {
        Ok(proxied) => proxied_response(proxied),
        Err(e) => error_response(&e),
    }
}

/// Emit a proxied upstream response. Success responses carry a
/// Cache-Control directive reflecting the resolved TTL; non-2xx statuses
/// are forwarded verbatim without one.
fn proxied_response(proxied: ProxiedResponse) -> Response {
    let status =
        StatusCode::from_u16(proxied.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    let mut builder = Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, proxied.content_type);
    if status.is_success() {
        builder = builder.header(
            header::CACHE_CONTROL,
            format!("public, max-age={}", proxied.cache_ttl_secs),
        );
    }

    match builder.body(Body::from(proxied.body)) {
        Ok(response) => response,
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

/// Map a `ProxyError` to its JSON error body.
fn error_response(error: &ProxyError) -> Response {
    let status =
        StatusCode::from_u16(error.http_status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    let body = match error {
        ProxyError::InvalidTime {
            layer,
            time,
            available_count,
            latest_available,
        } => json!({
            "error": error.reason_code(),
            "layer": layer,
            "time": time,
            "available_count": available_count,
            "latest_available": latest_available,
        }),
        _ => json!({
            "error": error.reason_code(),
            "detail": error.to_string(),
        }),
    };

    (status, Json(body)).into_response()
}
