use super::observe;
use crate::{
    error::{AppError, Result},
    relay::AUDIO_CONTENT_TYPE,
    server::{state::AppState, url_validation::validate_relay_url},
};
use axum::{
    body::Body,
    extract::{Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::time::Instant;

#[derive(Debug, Deserialize)]
pub struct RelayParams {
    url: Option<String>,
}

/// Relay audio bytes from an already-resolved URL.
///
/// The status is committed once upstream answers; a later upstream failure
/// ends the body early rather than turning into an error response.
pub async fn proxy_stream(
    Query(params): Query<RelayParams>,
    State(state): State<AppState>,
) -> Result<Response> {
    let start = Instant::now();
    let result = open_relay(&state, params.url.as_deref()).await;
    observe("proxy_stream", start, StatusCode::OK, &result);

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, AUDIO_CONTENT_TYPE)],
        Body::from_stream(result?),
    )
        .into_response())
}

async fn open_relay(state: &AppState, url: Option<&str>) -> Result<crate::relay::RelayStream> {
    let url = url
        .filter(|u| !u.is_empty())
        .ok_or(AppError::MissingParam("Missing URL"))?;
    let url = validate_relay_url(url, state.config.relay_allow_private)?;

    state.relay.open(url.as_str()).await
}
