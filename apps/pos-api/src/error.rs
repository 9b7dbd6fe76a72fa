//! # API Error Type
//!
//! Unified error type for HTTP handlers.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Aurum POS                              │
//! │                                                                         │
//! │  Handler returns Result<T, ApiError>                                   │
//! │         │                                                               │
//! │         ├── CoreError (business rule) ──► 400/404 + specific code      │
//! │         ├── DbError::Domain(CoreError) ──► same mapping                │
//! │         ├── DbError (storage) ──────────► 500, cause logged only       │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  { "error": "insufficient_stock", "message": "Stock insuficiente..." } │
//! │                                                                         │
//! │  The POS frontend switches on `error` and shows `message` verbatim.    │
//! │  Storage failures never leak internals to the client.                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;

use aurum_core::{CoreError, ValidationError};
use aurum_db::DbError;

/// API error returned from HTTP handlers.
///
/// Serialized as `{ "error": "<code>", "message": "<human readable>" }`.
#[derive(Debug, Clone, Serialize)]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Resource not found (404)
    NotFound,

    /// Input validation failed (400)
    ValidationError,

    /// Not enough stock for a sale line (400)
    InsufficientStock,

    /// Cash tendered under the amount due (400)
    InsufficientCash,

    /// Mixed tender parts don't sum to the total (400)
    InvalidTender,

    /// Payment exceeds the outstanding balance (400)
    ExcessPayment,

    /// Register close attempted with nothing to close (400)
    NothingToClose,

    /// Concurrent write conflict (409)
    Conflict,

    /// The underlying store failed (500)
    StorageFailure,
}

impl ErrorCode {
    const fn status(&self) -> StatusCode {
        match self {
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::ValidationError
            | ErrorCode::InsufficientStock
            | ErrorCode::InsufficientCash
            | ErrorCode::InvalidTender
            | ErrorCode::ExcessPayment
            | ErrorCode::NothingToClose => StatusCode::BAD_REQUEST,
            ErrorCode::Conflict => StatusCode::CONFLICT,
            ErrorCode::StorageFailure => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    const fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::NotFound => "not_found",
            ErrorCode::ValidationError => "validation_error",
            ErrorCode::InsufficientStock => "insufficient_stock",
            ErrorCode::InsufficientCash => "insufficient_cash",
            ErrorCode::InvalidTender => "invalid_tender",
            ErrorCode::ExcessPayment => "excess_payment",
            ErrorCode::NothingToClose => "nothing_to_close",
            ErrorCode::Conflict => "conflict",
            ErrorCode::StorageFailure => "storage_failure",
        }
    }
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    /// Creates a not found error.
    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(ErrorCode::NotFound, format!("{resource} no encontrada: {id}"))
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.code.status();
        let body = Json(json!({
            "error": self.code.as_str(),
            "message": self.message,
        }));
        (status, body).into_response()
    }
}

/// Converts core business errors to API errors.
impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let code = match &err {
            CoreError::ProductNotFound(_)
            | CoreError::ClientNotFound(_)
            | CoreError::SaleNotFound(_)
            | CoreError::AccountNotFound(_) => ErrorCode::NotFound,
            CoreError::InsufficientStock { .. } => ErrorCode::InsufficientStock,
            CoreError::InsufficientCash { .. } => ErrorCode::InsufficientCash,
            CoreError::InvalidTender { .. } => ErrorCode::InvalidTender,
            CoreError::ExcessPayment { .. } => ErrorCode::ExcessPayment,
            CoreError::NothingToClose => ErrorCode::NothingToClose,
            CoreError::Validation(_) => ErrorCode::ValidationError,
        };
        ApiError::new(code, err.to_string())
    }
}

/// Converts validation errors directly (boundary parsing).
impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::validation(err.to_string())
    }
}

/// Converts database errors to API errors.
///
/// Business rules that failed inside a transaction travel as
/// `DbError::Domain` and keep their specific code; genuine storage
/// failures are logged in full and surfaced as a generic 500.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Domain(core) => core.into(),
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            DbError::UniqueViolation { field } => ApiError::new(
                ErrorCode::Conflict,
                format!("Registro duplicado: {field}"),
            ),
            DbError::ForeignKeyViolation { message } => {
                tracing::error!("Foreign key violation: {message}");
                ApiError::validation("Referencia invalida")
            }
            other => {
                tracing::error!("Storage failure: {other}");
                ApiError::new(ErrorCode::StorageFailure, "Error de almacenamiento")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_error_codes() {
        let err: ApiError = CoreError::NothingToClose.into();
        assert!(matches!(err.code, ErrorCode::NothingToClose));
        assert_eq!(err.code.status(), StatusCode::BAD_REQUEST);

        let err: ApiError = CoreError::ProductNotFound("x".to_string()).into();
        assert_eq!(err.code.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_domain_errors_keep_their_code_through_db() {
        let err: ApiError = DbError::Domain(CoreError::ExcessPayment {
            outstanding_cents: 70_000,
            requested_cents: 80_000,
        })
        .into();
        assert!(matches!(err.code, ErrorCode::ExcessPayment));
    }

    #[test]
    fn test_storage_failures_are_opaque() {
        let err: ApiError = DbError::QueryFailed("secret detail".to_string()).into();
        assert!(matches!(err.code, ErrorCode::StorageFailure));
        assert!(!err.message.contains("secret"));
    }
}
