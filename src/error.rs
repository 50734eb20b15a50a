//! Request-level error taxonomy and its HTTP mapping.
//!
//! Four caller-visible classes: validation (400, with enough detail to
//! correct the request), authorization (401, uniform body regardless of
//! which check failed), upstream data-source failure (502) and internal
//! faults (500, details logged but not leaked). Partial push-delivery
//! failures are not errors at this level; the notifier recovers from
//! them locally and reports counts.

use axum::{http::StatusCode, response::IntoResponse, response::Response, Json};
use serde_json::json;
use thiserror::Error;
use tracing::error;

// ---

#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed or missing caller input; the message tells the caller
    /// what to fix.
    #[error("{0}")]
    Validation(String),

    /// Missing identity or insufficient role. Deliberately carries no
    /// detail about which check failed.
    #[error("not authorized")]
    Unauthorized,

    #[error("{0} not found")]
    NotFound(String),

    /// The predictive/meteorological source is unavailable. No retry at
    /// this layer; that belongs to the ingestion collaborator.
    #[error("upstream weather source unavailable: {0}")]
    Upstream(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<sqlx::Error> for ApiError {
    fn from(e: sqlx::Error) -> Self {
        ApiError::Internal(e.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // ---
        let (status, message) = match &self {
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "not authorized".to_string()),
            ApiError::NotFound(what) => (StatusCode::NOT_FOUND, format!("{what} not found")),
            ApiError::Upstream(msg) => {
                error!("upstream weather source failure: {}", msg);
                (
                    StatusCode::BAD_GATEWAY,
                    "upstream weather source unavailable".to_string(),
                )
            }
            ApiError::Internal(e) => {
                error!("internal error: {:#}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string())
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn validation_maps_to_bad_request() {
        // ---
        let resp = ApiError::Validation("missing required parameter: state".into()).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn authorization_is_uniform() {
        // ---
        let resp = ApiError::Unauthorized.into_response();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::Unauthorized.to_string(), "not authorized");
    }

    #[test]
    fn upstream_maps_to_bad_gateway() {
        // ---
        let resp = ApiError::Upstream("connection refused".into()).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    }
}
