use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

pub type Result<T> = std::result::Result<T, AppError>;

/// Failure of a single resolution attempt through one proxy.
///
/// Recovered inside the resolver; only surfaces wrapped in
/// [`AppError::ResolutionFailed`] once the whole pool is exhausted.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AttemptError {
    #[error("attempt timed out")]
    Timeout,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("upstream returned status {0}")]
    Status(u16),

    #[error("malformed upstream response: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for AttemptError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            AttemptError::Timeout
        } else if let Some(status) = e.status() {
            AttemptError::Status(status.as_u16())
        } else if e.is_decode() {
            AttemptError::Malformed(e.to_string())
        } else {
            AttemptError::Transport(e.to_string())
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Failed to resolve stream for {identifier} after {attempts} attempt(s): {last}")]
    ResolutionFailed {
        identifier: String,
        attempts: usize,
        last: AttemptError,
    },

    #[error("{0}")]
    MissingParam(&'static str),

    #[error("Invalid relay URL: {0}")]
    InvalidRelayUrl(String),

    #[error("Relay upstream error: {0}")]
    RelayUpstream(String),

    #[error("Relay interrupted: {0}")]
    RelayInterrupted(String),

    #[error("Catalog client unavailable")]
    CatalogUnavailable,

    #[error("{0}")]
    Catalog(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::MissingParam(_) | AppError::InvalidRelayUrl(_) => StatusCode::BAD_REQUEST,
            AppError::RelayUpstream(_) | AppError::RelayInterrupted(_) => StatusCode::BAD_GATEWAY,
            AppError::Configuration(_)
            | AppError::ResolutionFailed { .. }
            | AppError::CatalogUnavailable
            | AppError::Catalog(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<AppError> for std::io::Error {
    fn from(e: AppError) -> Self {
        std::io::Error::other(e.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        }

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_param_is_bad_request_with_bare_message() {
        let err = AppError::MissingParam("Missing video ID");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "Missing video ID");
    }

    #[test]
    fn resolution_failed_carries_last_cause() {
        let err = AppError::ResolutionFailed {
            identifier: "vid1".to_string(),
            attempts: 3,
            last: AttemptError::Status(403),
        };
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let msg = err.to_string();
        assert!(msg.contains("vid1"));
        assert!(msg.contains("3 attempt"));
        assert!(msg.contains("403"));
    }

    #[test]
    fn relay_errors_map_to_bad_gateway() {
        assert_eq!(
            AppError::RelayUpstream("boom".into()).status(),
            StatusCode::BAD_GATEWAY
        );
    }
}
