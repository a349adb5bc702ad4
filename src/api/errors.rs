//! Error types for the HTTP surface.
//!
//! The one mapping that matters to callers: the store's typed contention
//! error becomes `503 Service Unavailable` with a retry hint, distinct from
//! the generic 500, because that condition is expected under load and the
//! request is safe to repeat.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use crate::store::StoreError;

/// Result type for API handlers.
pub type ApiResult<T> = Result<T, ApiError>;

/// API errors.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// Invalid request body caught before reaching the services.
    #[error("validation error: {0}")]
    Validation(String),

    /// Error surfaced by the store or services.
    #[error("{0}")]
    Store(#[from] StoreError),

    /// Failure in the handler plumbing itself.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Store(StoreError::LockContention(_)) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Store(StoreError::NotFound { .. }) => StatusCode::NOT_FOUND,
            ApiError::Store(StoreError::WrongEpisode { .. }) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// User-facing message.
    fn message(&self) -> String {
        match self {
            ApiError::Store(StoreError::LockContention(_)) => {
                "temporarily unavailable, please try again".to_string()
            }
            other => other.to_string(),
        }
    }
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
}

impl From<&ApiError> for ErrorResponse {
    fn from(err: &ApiError) -> Self {
        Self {
            error: err.message(),
            code: err.status_code().as_u16(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status_code().is_server_error() {
            tracing::error!(%self, "request failed");
        }
        let status = self.status_code();
        let body = Json(ErrorResponse::from(&self));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{PartId, RowKey};

    #[test]
    fn test_contention_maps_to_service_unavailable() {
        let err = ApiError::from(StoreError::LockContention(RowKey::Part(PartId(1))));
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_not_found_maps_to_404() {
        let err = ApiError::from(StoreError::part_not_found(9));
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_validation_maps_to_400() {
        assert_eq!(
            ApiError::Validation("title must not be empty".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_contention_message_is_a_retry_hint() {
        let err = ApiError::from(StoreError::LockContention(RowKey::Part(PartId(1))));
        let body = ErrorResponse::from(&err);
        assert!(body.error.contains("try again"));
        assert_eq!(body.code, 503);
    }
}
