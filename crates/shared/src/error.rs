//! Application-wide error envelope returned to API callers.

use serde_json::{Value, json};
use thiserror::Error;

/// Result type alias using `AppError`.
pub type AppResult<T> = Result<T, AppError>;

/// Application error types.
///
/// Domain errors are converted into this envelope at the API boundary so
/// every response carries a stable machine-readable code.
#[derive(Debug, Error)]
pub enum AppError {
    /// A user-facing precondition failed; never retried by the engine.
    #[error("{message}")]
    Precondition {
        /// Stable machine-readable code.
        code: &'static str,
        /// Human-readable message.
        message: String,
        /// Optional structured context for the caller.
        details: Option<Value>,
    },

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Request could not be parsed or validated.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Conflicting concurrent operation; safe to resubmit.
    #[error("{message}")]
    Conflict {
        /// Stable machine-readable code.
        code: &'static str,
        /// Human-readable message.
        message: String,
    },

    /// Payment service provider error.
    #[error("{message}")]
    ExternalService {
        /// Stable machine-readable code.
        code: &'static str,
        /// Human-readable message.
        message: String,
    },

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Precondition { .. } | Self::Validation(_) => 400,
            Self::NotFound(_) => 404,
            Self::Conflict { .. } => 409,
            Self::ExternalService { .. } => 502,
            Self::Database(_) | Self::Internal(_) => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Precondition { code, .. }
            | Self::Conflict { code, .. }
            | Self::ExternalService { code, .. } => *code,
            Self::NotFound(_) => "NOT_FOUND",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Renders the JSON body sent to API callers.
    ///
    /// Database and internal errors hide their message.
    #[must_use]
    pub fn to_body(&self) -> Value {
        let message = match self {
            Self::Database(_) | Self::Internal(_) => "An internal error occurred".to_string(),
            other => other.to_string(),
        };
        let mut body = json!({
            "error": self.error_code(),
            "message": message,
        });
        if let Self::Precondition {
            details: Some(details),
            ..
        } = self
        {
            body["details"] = details.clone();
        }
        body
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
