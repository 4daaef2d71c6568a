use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use common::storage::StorageError;
use sea_orm::DbErr;
use serde::Serialize;

use crate::extractors::correlation;

/// Structured error response returned by all endpoints on failure.
#[derive(Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    /// Machine-readable error code. One of: `VALIDATION_ERROR`, `UNAUTHORIZED`,
    /// `FORBIDDEN`, `NOT_FOUND`, `CONFLICT`, `UNSUPPORTED_MEDIA_TYPE`,
    /// `PAYLOAD_TOO_LARGE`, `RATE_LIMITED`, `SERVICE_UNAVAILABLE`, `INTERNAL_ERROR`.
    #[schema(example = "VALIDATION_ERROR")]
    pub code: &'static str,
    /// Human-readable error description.
    #[schema(example = "Missing slug")]
    pub error: String,
    /// Correlation id of the request, matching audit and log entries.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
}

/// Application-level error type.
#[derive(Debug)]
pub enum AppError {
    Validation(String),
    Unauthorized(String),
    Forbidden(String),
    NotFound(String),
    Conflict(String),
    UnsupportedMediaType(String),
    PayloadTooLarge(String),
    /// Rate limit exceeded. Contains seconds until retry is allowed.
    RateLimited {
        retry_after: u64,
    },
    Unavailable(String),
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code_and_message(self) -> (&'static str, String) {
        match self {
            AppError::Validation(msg) => ("VALIDATION_ERROR", msg),
            AppError::Unauthorized(msg) => ("UNAUTHORIZED", msg),
            AppError::Forbidden(msg) => ("FORBIDDEN", msg),
            AppError::NotFound(msg) => ("NOT_FOUND", msg),
            AppError::Conflict(msg) => ("CONFLICT", msg),
            AppError::UnsupportedMediaType(msg) => ("UNSUPPORTED_MEDIA_TYPE", msg),
            AppError::PayloadTooLarge(msg) => ("PAYLOAD_TOO_LARGE", msg),
            AppError::RateLimited { retry_after } => (
                "RATE_LIMITED",
                format!("Rate limit exceeded. Try again in {} seconds", retry_after),
            ),
            AppError::Unavailable(msg) => ("SERVICE_UNAVAILABLE", msg),
            AppError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                ("INTERNAL_ERROR", "An unexpected error occurred".into())
            }
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppError::RateLimited { retry_after } => {
                write!(f, "rate limited (retry after {retry_after}s)")
            }
            AppError::Validation(msg)
            | AppError::Unauthorized(msg)
            | AppError::Forbidden(msg)
            | AppError::NotFound(msg)
            | AppError::Conflict(msg)
            | AppError::UnsupportedMediaType(msg)
            | AppError::PayloadTooLarge(msg)
            | AppError::Unavailable(msg)
            | AppError::Internal(msg) => f.write_str(msg),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let retry_after = if let AppError::RateLimited { retry_after } = &self {
            Some(*retry_after)
        } else {
            None
        };

        let (code, error) = self.code_and_message();
        let body = ErrorBody {
            code,
            error,
            correlation_id: correlation::current(),
        };

        if let Some(seconds) = retry_after {
            (status, [("Retry-After", seconds.to_string())], Json(body)).into_response()
        } else {
            (status, Json(body)).into_response()
        }
    }
}

impl From<DbErr> for AppError {
    fn from(err: DbErr) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(key) => AppError::NotFound(format!("Object '{key}' not found")),
            StorageError::InvalidKey(msg) => AppError::Validation(format!("Invalid object key: {msg}")),
            StorageError::Unsupported(op) => {
                AppError::Unavailable(format!("Storage backend does not support {op}"))
            }
            other => AppError::Internal(other.to_string()),
        }
    }
}
