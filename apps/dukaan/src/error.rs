//! # API Error Type
//!
//! Unified error type for application commands.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Dukaan POS                             │
//! │                                                                         │
//! │  UI layer                    Rust Backend                               │
//! │  ────────                    ────────────                               │
//! │                                                                         │
//! │  record_sale(request)                                                   │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  Command Function                                                │  │
//! │  │  Result<T, ApiError>                                             │  │
//! │  │         │                                                        │  │
//! │  │         ▼                                                        │  │
//! │  │  Storage Error? ─── DbError::QueryFailed("...") ───┐            │  │
//! │  │         │            (logged, generic message)     │            │  │
//! │  │         ▼                                          ▼            │  │
//! │  │  Validation Error? ─── ValidationError::EmptySale ── ApiError ─►│  │
//! │  │         │                                                        │  │
//! │  │         ▼                                                        │  │
//! │  │  Success ──────────────────────────────────────────────────────►│  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │                                                                         │
//! │  Read commands never reach the UI as errors: they log and return       │
//! │  an empty result.                                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use dukaan_core::{CoreError, ValidationError};
use dukaan_db::DbError;
use serde::Serialize;
use thiserror::Error;

use crate::state::ConfigError;

/// Error returned from write commands.
///
/// ## Serialization
/// ```json
/// {
///   "code": "INSUFFICIENT_STOCK",
///   "message": "Insufficient stock for Tata Salt 1kg: requested 3"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Message suitable for direct display
    pub message: String,
}

/// Error codes for command responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Resource not found
    NotFound,

    /// Input validation failed
    ValidationError,

    /// A barcode or product code is already taken
    Duplicate,

    /// Database operation failed
    DatabaseError,

    /// A sale line asked for more than is on hand
    InsufficientStock,

    /// Internal error
    Internal,
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
        ApiError::new(ErrorCode::NotFound, format!("{} not found: {}", resource, id))
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }
}

/// Converts database errors to API errors.
///
/// Storage details go to the log; the caller gets a generic message.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            DbError::UniqueViolation { field, value } => ApiError::new(
                ErrorCode::Duplicate,
                format!("{} '{}' already exists", field, value),
            ),
            DbError::InsufficientStock { product, requested } => ApiError::new(
                ErrorCode::InsufficientStock,
                format!("Insufficient stock for {}: requested {}", product, requested),
            ),
            DbError::Validation(message) => ApiError::validation(message),
            DbError::ForeignKeyViolation { message } => {
                tracing::error!(%message, "Foreign key violation");
                ApiError::validation("Invalid reference")
            }
            DbError::ConnectionFailed(e) => {
                tracing::error!(error = %e, "Database connection failed");
                ApiError::new(ErrorCode::DatabaseError, "Database connection failed")
            }
            DbError::MigrationFailed(e) => {
                tracing::error!(error = %e, "Schema upgrade failed");
                ApiError::new(ErrorCode::DatabaseError, "Database upgrade failed")
            }
            DbError::QueryFailed(e) => {
                tracing::error!(error = %e, "Database query failed");
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
            DbError::PoolExhausted => ApiError::new(ErrorCode::DatabaseError, "Database is busy, try again"),
            DbError::Io(e) => {
                tracing::error!(error = %e, "File operation failed");
                ApiError::new(ErrorCode::DatabaseError, format!("File operation failed: {}", e.kind()))
            }
            DbError::Internal(e) => {
                tracing::error!(error = %e, "Internal database error");
                ApiError::internal("Database operation failed")
            }
        }
    }
}

/// Converts core errors to API errors.
impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(e) => e.into(),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::validation(err.to_string())
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

// =============================================================================
// Startup Errors
// =============================================================================

/// Failures that stop the application from starting.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Includes a schema upgrade that could not commit.
    #[error("Database error: {0}")]
    Database(#[from] DbError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_errors_get_generic_message() {
        let err: ApiError = DbError::QueryFailed("no such column: secret_detail".to_string()).into();
        assert_eq!(err.code, ErrorCode::DatabaseError);
        assert!(!err.message.contains("secret_detail"));
    }

    #[test]
    fn test_validation_passes_message_through() {
        let err: ApiError = CoreError::Validation(ValidationError::EmptySale).into();
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert_eq!(err.message, "Sale must contain at least one item");
    }

    #[test]
    fn test_insufficient_stock_code() {
        let err: ApiError = DbError::InsufficientStock {
            product: "Tata Salt 1kg".to_string(),
            requested: 3,
        }
        .into();
        assert_eq!(err.code, ErrorCode::InsufficientStock);
        assert!(err.message.contains("Tata Salt 1kg"));
    }

    #[test]
    fn test_serialized_shape() {
        let err = ApiError::not_found("Product", "42");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["code"], "NOT_FOUND");
        assert_eq!(json["message"], "Product not found: 42");
    }
}
