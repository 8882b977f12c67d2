//! HTTP-facing error type and its mapping from domain errors.

use bucketgate_auth::AuthError;
use bucketgate_core::types::ItemOutcome;
use bucketgate_core::{GatewayError, StoreError};
use http::StatusCode;

/// Result alias for request handling.
pub type ApiResult<T> = Result<T, ApiError>;

/// An error rendered as `{"error", "message", "requestId", "outcomes"?}`.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{code}: {message}")]
pub struct ApiError {
    /// HTTP status.
    pub status: StatusCode,
    /// Stable machine-readable code.
    pub code: &'static str,
    /// Human-readable description.
    pub message: String,
    /// Per-item outcomes, for failed bulk transfers.
    pub outcomes: Option<Vec<ItemOutcome>>,
}

impl ApiError {
    /// Create an error without outcomes.
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            outcomes: None,
        }
    }

    /// `400 BadRequest`.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "BadRequest", message)
    }

    /// `404 NoSuchRoute`.
    pub fn no_such_route(method: &http::Method, path: &str) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            "NoSuchRoute",
            format!("no route for {method} {path}"),
        )
    }

    /// `405 MethodNotAllowed`.
    pub fn method_not_allowed(method: &http::Method, path: &str) -> Self {
        Self::new(
            StatusCode::METHOD_NOT_ALLOWED,
            "MethodNotAllowed",
            format!("{method} is not allowed on {path}"),
        )
    }

    /// `413 PayloadTooLarge`.
    pub fn payload_too_large(limit: usize) -> Self {
        Self::new(
            StatusCode::PAYLOAD_TOO_LARGE,
            "PayloadTooLarge",
            format!("request body exceeds {limit} bytes"),
        )
    }

    /// `403 AccessDenied`.
    pub fn access_denied(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, "AccessDenied", message)
    }

    /// `500 InternalError`.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "InternalError", message)
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        Self::access_denied(err.to_string())
    }
}

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        let message = err.to_string();
        match err {
            GatewayError::BucketNotFound { .. } => {
                Self::new(StatusCode::NOT_FOUND, "NoSuchBucket", message)
            }
            GatewayError::ObjectNotFound { .. } => {
                Self::new(StatusCode::NOT_FOUND, "NoSuchKey", message)
            }
            GatewayError::BadRequest(_) => Self::bad_request(message),
            GatewayError::InvalidBucketName { .. } => {
                Self::new(StatusCode::BAD_REQUEST, "InvalidBucketName", message)
            }
            GatewayError::NothingToDelete => {
                Self::new(StatusCode::BAD_REQUEST, "NothingToDelete", message)
            }
            GatewayError::BucketAlreadyExists { .. } => {
                Self::new(StatusCode::CONFLICT, "BucketAlreadyExists", message)
            }
            GatewayError::BucketNotEmpty { .. } => {
                Self::new(StatusCode::CONFLICT, "BucketNotEmpty", message)
            }
            GatewayError::TransferFailed(outcome) => Self {
                outcomes: Some(outcome.outcomes),
                ..Self::new(StatusCode::INTERNAL_SERVER_ERROR, "TransferFailed", message)
            },
            GatewayError::BatchDeleteFailed { .. } => {
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "BatchDeleteFailed", message)
            }
            GatewayError::Store(StoreError::Signing(_)) => Self::internal(message),
            GatewayError::Store(_) => {
                Self::new(StatusCode::BAD_GATEWAY, "StoreUnavailable", message)
            }
        }
    }
}
