//! Catalog pass-through routes. Each forwards to [`CatalogClient`] and
//! returns the upstream JSON unchanged.
//!
//! [`CatalogClient`]: crate::catalog::CatalogClient

use super::observe;
use crate::{
    error::{AppError, Result},
    server::state::AppState,
};
use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Instant;
use tracing::info;

type Params = Query<HashMap<String, String>>;

fn required<'a>(
    params: &'a HashMap<String, String>,
    key: &str,
    missing: &'static str,
) -> Result<&'a str> {
    params
        .get(key)
        .map(String::as_str)
        .filter(|v| !v.is_empty())
        .ok_or(AppError::MissingParam(missing))
}

fn respond(endpoint: &'static str, start: Instant, result: Result<Value>) -> Result<Json<Value>> {
    observe(endpoint, start, StatusCode::OK, &result);
    result.map(Json)
}

pub async fn search(Query(params): Params, State(state): State<AppState>) -> Result<Json<Value>> {
    let start = Instant::now();
    let query = required(&params, "q", "Missing search query")?;
    info!("Catalog search: {}", query);
    respond("search", start, state.catalog.search(query).await)
}

pub async fn metadata(
    Query(params): Params,
    State(state): State<AppState>,
) -> Result<Json<Value>> {
    let start = Instant::now();
    let video_id = required(&params, "q", "Missing video ID")?;
    info!("Catalog metadata: {}", video_id);
    respond("metadata", start, state.catalog.song(video_id).await)
}

pub async fn trending(State(state): State<AppState>) -> Result<Json<Value>> {
    let start = Instant::now();
    info!("Catalog charts");
    respond("trending", start, state.catalog.charts().await)
}

pub async fn playlist(
    Query(params): Params,
    State(state): State<AppState>,
) -> Result<Json<Value>> {
    let start = Instant::now();
    let id = required(&params, "id", "Missing playlist ID")?;
    info!("Catalog playlist: {}", id);
    respond("playlist", start, state.catalog.playlist(id).await)
}

pub async fn album(Query(params): Params, State(state): State<AppState>) -> Result<Json<Value>> {
    let start = Instant::now();
    let id = required(&params, "id", "Missing album ID")?;
    info!("Catalog album: {}", id);
    respond("album", start, state.catalog.album(id).await)
}

pub async fn artist(Query(params): Params, State(state): State<AppState>) -> Result<Json<Value>> {
    let start = Instant::now();
    let id = required(&params, "id", "Missing artist ID")?;
    info!("Catalog artist: {}", id);
    respond("artist", start, state.catalog.artist(id).await)
}
