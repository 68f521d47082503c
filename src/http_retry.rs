//! HTTP GET with bounded retry and fixed backoff.
//!
//! Used by the catalog client, whose upstream calls are idempotent lookups.
//! Client errors (4xx other than 429) are returned on the first attempt since
//! repeating them cannot succeed.

use reqwest::{Client, Response, StatusCode};
use std::time::Duration;
use tracing::warn;
use url::Url;

/// Default number of fetch attempts (1 initial + 1 retry).
pub const DEFAULT_MAX_ATTEMPTS: u32 = 2;

/// Default backoff between attempts in milliseconds.
pub const DEFAULT_BACKOFF_MS: u64 = 500;

#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total number of attempts (0 is treated as 1).
    pub max_attempts: u32,
    pub backoff: Duration,
    /// Per-attempt timeout; `None` leaves the client's own timeout in charge.
    pub timeout: Option<Duration>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff: Duration::from_millis(DEFAULT_BACKOFF_MS),
            timeout: None,
        }
    }
}

/// GET `url`, retrying transport failures, timeouts, 429 and 5xx.
///
/// # Errors
/// The last [`reqwest::Error`] once attempts run out, or the first
/// non-retryable one.
pub async fn fetch_with_retry(
    client: &Client,
    url: &Url,
    config: &RetryConfig,
) -> Result<Response, reqwest::Error> {
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        let mut request = client.get(url.clone());
        if let Some(timeout) = config.timeout {
            request = request.timeout(timeout);
        }

        match request.send().await.and_then(Response::error_for_status) {
            Ok(response) => return Ok(response),
            Err(e) if attempt < max_attempts && is_retryable(&e) => {
                warn!(
                    "GET {} failed (attempt {}/{}): {}; retrying in {}ms",
                    url,
                    attempt,
                    max_attempts,
                    e,
                    config.backoff.as_millis()
                );
                tokio::time::sleep(config.backoff).await;
                attempt += 1;
            }
            Err(e) => {
                warn!(
                    "GET {} failed (attempt {}/{}): {}",
                    url, attempt, max_attempts, e
                );
                return Err(e);
            }
        }
    }
}

fn is_retryable(e: &reqwest::Error) -> bool {
    match e.status() {
        Some(status) => status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS,
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn uri(server: &MockServer) -> Url {
        Url::parse(&server.uri()).unwrap()
    }

    fn fast(max_attempts: u32) -> RetryConfig {
        RetryConfig {
            max_attempts,
            backoff: Duration::from_millis(1),
            timeout: None,
        }
    }

    #[test]
    fn defaults() {
        let cfg = RetryConfig::default();
        assert_eq!(cfg.max_attempts, DEFAULT_MAX_ATTEMPTS);
        assert_eq!(cfg.backoff, Duration::from_millis(DEFAULT_BACKOFF_MS));
        assert!(cfg.timeout.is_none());
    }

    #[tokio::test]
    async fn retries_server_error_then_succeeds() {
        let server = MockServer::start().await;

        // Fallback mounted first has lower priority
        Mock::given(method("GET"))
            .and(path("/charts"))
            .respond_with(ResponseTemplate::new(200).set_body_string("charts"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/charts"))
            .respond_with(ResponseTemplate::new(502))
            .up_to_n_times(1)
            .mount(&server)
            .await;

        let response = fetch_with_retry(
            &Client::new(),
            &Url::parse(&format!("{}/charts", server.uri())).unwrap(),
            &fast(2),
        )
        .await
        .unwrap();
        assert_eq!(response.text().await.unwrap(), "charts");
    }

    #[tokio::test]
    async fn not_found_is_not_retried() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let err = fetch_with_retry(&Client::new(), &uri(&server), &fast(3))
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .expect(3)
            .mount(&server)
            .await;

        let result = fetch_with_retry(&Client::new(), &uri(&server), &fast(3)).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn zero_attempts_still_tries_once() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        assert!(
            fetch_with_retry(&Client::new(), &uri(&server), &fast(0))
                .await
                .is_err()
        );
    }
}
