use crate::server::state::AppState;
use axum::{
    Json,
    extract::State,
    http::{StatusCode, Uri, header},
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};

pub async fn health_check(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_seconds": state.started_at.elapsed().as_secs(),
        "cached_streams": state.streams.cache().len(),
        "proxies": state.streams.resolver().pool().size(),
        "catalog_healthy": state.catalog.is_healthy(),
    }))
}

/// Prometheus text exposition.
pub async fn metrics(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => (StatusCode::SERVICE_UNAVAILABLE, "metrics recorder not installed\n").into_response(),
    }
}

pub async fn favicon() -> StatusCode {
    StatusCode::NO_CONTENT
}

/// Echo any unmatched path back as `{"catch": "<path>"}`.
pub async fn catch_all(uri: Uri) -> Json<Value> {
    Json(json!({ "catch": uri.path().trim_start_matches('/') }))
}
