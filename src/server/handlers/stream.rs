use super::observe;
use crate::{
    error::{AppError, Result},
    server::state::AppState,
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Instant;
use tracing::info;

#[derive(Debug, Deserialize)]
pub struct StreamParams {
    video_id: Option<String>,
}

/// `GET /stream?video_id=` → `{"url": "<direct url>"}`
pub async fn stream_url(
    Query(params): Query<StreamParams>,
    State(state): State<AppState>,
) -> Result<Json<Value>> {
    let start = Instant::now();
    let result = resolve(&state, params.video_id.as_deref()).await;
    observe("stream", start, StatusCode::OK, &result);

    let url = result?;
    Ok(Json(json!({ "url": url })))
}

/// `GET /stream/{video_id}` → 302 to the resolved URL
pub async fn stream_redirect(
    Path(video_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Response> {
    let start = Instant::now();
    let result = resolve(&state, Some(&video_id)).await;
    observe("stream_redirect", start, StatusCode::FOUND, &result);

    Ok((StatusCode::FOUND, [(header::LOCATION, result?)]).into_response())
}

async fn resolve(state: &AppState, video_id: Option<&str>) -> Result<String> {
    let video_id = video_id
        .filter(|id| !id.is_empty())
        .ok_or(AppError::MissingParam("Missing video ID"))?;

    info!("Stream requested for {}", video_id);
    state.streams.stream_url(video_id).await
}
