//! Domain error types for the ingestion server.
//!
//! Uses thiserror for ergonomic error handling with automatic Display implementations.
//! Terminal errors (401/400/404) must not be retried by the test runner; the
//! storage, lock and transaction errors are transient and answer 503.

use actix_web::{HttpResponse, ResponseError};
use std::fmt;

/// Application-level errors.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Database operation failed (connectivity, aborted transaction)
    #[error("Database error: {0}")]
    Database(String),

    /// Resource not found
    #[error("{0} not found")]
    NotFound(String),

    /// Missing or malformed request field
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Authentication failed
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The per-spec lock could not be acquired in time
    #[error("Timed out waiting for lock on {0}")]
    LockTimeout(String),

    /// The storage transaction did not finish in time
    #[error("Transaction timed out after {0}ms")]
    Timeout(u128),
}

impl AppError {
    /// Whether the caller may retry the request with backoff.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AppError::Database(_) | AppError::LockTimeout(_) | AppError::Timeout(_)
        )
    }

    /// Machine-readable error code sent to the runner.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Database(_) => "TRANSIENT_STORAGE_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::InvalidInput(_) => "VALIDATION_ERROR",
            AppError::Unauthorized(_) => "UNAUTHORIZED",
            AppError::LockTimeout(_) => "LOCK_TIMEOUT",
            AppError::Timeout(_) => "TRANSACTION_TIMEOUT",
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> actix_web::http::StatusCode {
        use actix_web::http::StatusCode;
        match self {
            AppError::Database(_) | AppError::LockTimeout(_) | AppError::Timeout(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            AppError::Database(err_str) => {
                tracing::error!("Database error: {}", err_str);
                "A transient storage error occurred, retry with backoff".to_string()
            }
            AppError::LockTimeout(_) | AppError::Timeout(_) => {
                tracing::warn!("{}", self);
                self.to_string()
            }
            _ => self.to_string(),
        };

        HttpResponse::build(self.status_code()).json(ErrorResponse {
            error: self.code().to_string(),
            message,
            retryable: self.is_retryable(),
        })
    }
}

/// Error response body matching OpenAPI schema.
#[derive(Debug, serde::Serialize, serde::Deserialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    /// True when the runner should retry the call with backoff.
    #[serde(default)]
    pub retryable: bool,
}

impl fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

// Conversion implementations for common error types

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidInput(format!("JSON parsing error: {}", err))
    }
}

impl From<sea_orm::DbErr> for AppError {
    fn from(err: sea_orm::DbErr) -> Self {
        AppError::Database(err.to_string())
    }
}

/// Rewrites request-body deserialization failures into `VALIDATION_ERROR` responses.
pub fn json_error_handler(
    err: actix_web::error::JsonPayloadError,
    _req: &actix_web::HttpRequest,
) -> actix_web::Error {
    AppError::InvalidInput(err.to_string()).into()
}
