//! Prometheus metrics.
//!
//! Thin wrappers over the `metrics` facade so call sites stay one line.
//! Recording is a no-op until [`install`] has set the global recorder.

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::Instant;
use tracing::warn;

static HANDLE: OnceLock<Option<PrometheusHandle>> = OnceLock::new();

/// Install the Prometheus recorder once per process.
///
/// Returns `None` if another recorder was already installed.
pub fn install() -> Option<PrometheusHandle> {
    HANDLE
        .get_or_init(|| match PrometheusBuilder::new().install_recorder() {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!("Prometheus recorder not installed: {}", e);
                None
            }
        })
        .clone()
}

pub fn record_request(endpoint: &'static str, status: u16) {
    counter!(
        "songrelay_requests_total",
        "endpoint" => endpoint,
        "status" => status.to_string()
    )
    .increment(1);
}

pub fn record_duration(endpoint: &'static str, start: Instant) {
    histogram!("songrelay_request_duration_seconds", "endpoint" => endpoint)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_cache(hit: bool) {
    let result = if hit { "hit" } else { "miss" };
    counter!("songrelay_cache_total", "result" => result).increment(1);
}

/// Outcome label is one of `success`, `timeout`, `transport`, `status`, `malformed`.
pub fn record_resolve_attempt(outcome: &'static str) {
    counter!("songrelay_resolve_attempts_total", "outcome" => outcome).increment(1);
}

pub fn record_relay_bytes(bytes: u64) {
    counter!("songrelay_relay_bytes_total").increment(bytes);
}
