//! Lock acquisition errors.

use thiserror::Error;

/// Errors raised while acquiring or releasing a lock.
#[derive(Debug, Clone, Error)]
pub enum LockError {
    /// The lock stayed held for the whole acquire timeout.
    #[error("Timed out after {waited_ms}ms acquiring lock {key}")]
    Timeout {
        /// Lock name.
        key: String,
        /// Time spent waiting.
        waited_ms: u64,
    },

    /// The lock backend itself failed.
    #[error("Lock backend error: {0}")]
    Backend(String),
}

impl LockError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        "LOCK_ACQUIRE_FAILED"
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        409
    }

    /// Nothing was written before the lock failed, so resubmitting is safe.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        true
    }
}
