//! API Error Types
//!
//! Defines error types for the API layer and implements conversion
//! to HTTP responses. Every error body is `{"error": "<message>"}`;
//! WHOOP's status code is passed through when it answered.

use axum::{
    extract::rejection::QueryRejection,
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::store::StoreError;
use crate::whoop::WhoopError;

/// API error types
#[derive(Error, Debug)]
pub enum ApiError {
    /// No logged-in session
    #[error("Not authenticated")]
    Unauthorized,

    /// Request validation failed
    #[error("Validation error: {0}")]
    Validation(String),

    /// WHOOP answered with an error status
    #[error("{message}")]
    Upstream { status: u16, message: String },

    /// WHOOP could not be reached or answered garbage
    #[error("WHOOP error: {0}")]
    Whoop(WhoopError),

    /// User store error
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<WhoopError> for ApiError {
    fn from(err: WhoopError) -> Self {
        match err {
            WhoopError::Api { status, message } => ApiError::Upstream { status, message },
            other => ApiError::Whoop(other),
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

/// Error response body
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Upstream { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            ApiError::Whoop(WhoopError::Timeout) => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Whoop(WhoopError::AuthFailed(_)) => StatusCode::UNAUTHORIZED,
            ApiError::Whoop(_) => StatusCode::BAD_GATEWAY,
            ApiError::Store(_) | ApiError::Internal(_) | ApiError::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let request_id = uuid::Uuid::new_v4().to_string();

        if status.is_server_error() {
            tracing::error!(
                request_id = %request_id,
                status = status.as_u16(),
                error_message = %self,
                "API error occurred"
            );
        } else {
            tracing::warn!(
                request_id = %request_id,
                status = status.as_u16(),
                error_message = %self,
                "API request rejected"
            );
        }

        let body = ErrorResponse {
            error: self.to_string(),
        };

        let mut response = (status, Json(body)).into_response();
        if let Ok(value) = HeaderValue::from_str(&request_id) {
            response.headers_mut().insert("x-request-id", value);
        }
        response
    }
}

/// Result type for API operations
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_status_passthrough() {
        let err: ApiError = WhoopError::Api {
            status: 429,
            message: "Too Many Requests".into(),
        }
        .into();
        assert_eq!(err.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(err.to_string(), "Too Many Requests");
    }

    #[test]
    fn test_invalid_upstream_status() {
        let err = ApiError::Upstream {
            status: 42,
            message: "weird".into(),
        };
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(ApiError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ApiError::Validation("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(WhoopError::Timeout).status(),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            ApiError::from(WhoopError::Unavailable).status(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[tokio::test]
    async fn test_error_body() {
        let response = ApiError::Unauthorized.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().contains_key("x-request-id"));

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body, serde_json::json!({"error": "Not authenticated"}));
    }
}
