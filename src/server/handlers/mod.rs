pub mod catalog;
pub mod health;
pub mod relay;
pub mod stream;

use crate::{error::Result, metrics};
use axum::http::StatusCode;
use std::time::Instant;

/// Record request count and latency for a finished handler result.
fn observe<T>(endpoint: &'static str, start: Instant, ok: StatusCode, result: &Result<T>) {
    let status = match result {
        Ok(_) => ok,
        Err(e) => e.status(),
    };
    metrics::record_request(endpoint, status.as_u16());
    metrics::record_duration(endpoint, start);
}
