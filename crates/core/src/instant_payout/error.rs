//! Instant payout error types.
//!
//! Precondition failures (eligibility, verification, request guards) carry
//! stable codes and are never retried by the engine. Provider failures carry
//! the payout they happened to, which has already been persisted in its
//! final or retryable state by the time the error is returned.

use payout_shared::AppError;
use payout_shared::types::{LedgerTransactionId, PayoutId, PayoutMethodId};
use serde_json::{Value, json};
use thiserror::Error;

use super::eligibility::{EligibilityDetails, IneligibleReason};
use crate::lock::LockError;
use crate::psp::PspError;
use crate::store::StoreError;

/// Errors raised by the instant payout engine.
#[derive(Debug, Error)]
pub enum PayoutError {
    /// An eligibility check failed.
    #[error("{}", reason.message())]
    Ineligible {
        /// Failed check.
        reason: IneligibleReason,
        /// Context for the caller.
        details: EligibilityDetails,
    },

    /// A transaction is not in a payable state.
    #[error("Transaction {transaction_id} is not in a payable state")]
    TransactionStateInvalid {
        /// Offending transaction.
        transaction_id: LedgerTransactionId,
    },

    /// A transaction was already swept by a transfer.
    #[error("Transaction {transaction_id} was already transferred")]
    TransactionAlreadyTransferred {
        /// Offending transaction.
        transaction_id: LedgerTransactionId,
    },

    /// A transaction is already reserved by a payout.
    #[error("Transaction {transaction_id} was already paid out")]
    TransactionAlreadyPaidOut {
        /// Offending transaction.
        transaction_id: LedgerTransactionId,
    },

    /// Requested amount differs from the unpaid balance.
    #[error("Requested amount {requested} does not match unpaid balance {balance}")]
    AmountBalanceMismatch {
        /// Requested amount.
        requested: i64,
        /// Sum of unpaid transactions.
        balance: i64,
    },

    /// Requested currency differs from the account's payout currency.
    #[error("Currency {requested} does not match account currency {expected}")]
    CurrencyMismatch {
        /// Requested currency.
        requested: String,
        /// Account currency.
        expected: String,
    },

    /// The requested card is not an active card of the account.
    #[error("Payout card {0} not found")]
    PayoutCardNotFound(PayoutMethodId),

    /// The per-account lock could not be acquired.
    #[error(transparent)]
    Lock(#[from] LockError),

    /// The provider rejected or failed a call for this payout.
    #[error("Provider call failed for payout {payout_id}: {source}")]
    Psp {
        /// Payout being submitted.
        payout_id: PayoutId,
        /// Classified provider failure.
        #[source]
        source: PspError,
    },

    /// Ledger storage failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl PayoutError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Ineligible { reason, .. } => reason.code(),
            Self::TransactionStateInvalid { .. } => "TRANSACTION_STATE_INVALID",
            Self::TransactionAlreadyTransferred { .. } => "TRANSACTION_ALREADY_TRANSFERRED",
            Self::TransactionAlreadyPaidOut { .. } => "TRANSACTION_ALREADY_PAID_OUT",
            Self::AmountBalanceMismatch { .. } => "AMOUNT_BALANCE_MISMATCH",
            Self::CurrencyMismatch { .. } => "CURRENCY_MISMATCH",
            Self::PayoutCardNotFound(_) => "PAYOUT_CARD_NOT_FOUND",
            Self::Lock(e) => e.error_code(),
            Self::Psp { source, .. } => source.error_code(),
            Self::Store(StoreError::NotFound { .. }) => "NOT_FOUND",
            Self::Store(_) => "DATABASE_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            Self::Ineligible { .. }
            | Self::TransactionStateInvalid { .. }
            | Self::TransactionAlreadyTransferred { .. }
            | Self::TransactionAlreadyPaidOut { .. }
            | Self::AmountBalanceMismatch { .. }
            | Self::CurrencyMismatch { .. }
            | Self::PayoutCardNotFound(_) => 400,
            Self::Lock(e) => e.http_status_code(),
            Self::Psp { source, .. } => source.http_status_code(),
            Self::Store(StoreError::NotFound { .. }) => 404,
            Self::Store(_) => 500,
        }
    }

    /// Returns true if resubmitting the same request may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Lock(_) | Self::Psp { .. })
    }

    /// Returns true for user-facing precondition failures.
    #[must_use]
    pub const fn is_precondition(&self) -> bool {
        self.http_status_code() == 400
    }

    /// Structured context returned alongside the error code.
    #[must_use]
    pub fn details(&self) -> Option<Value> {
        match self {
            Self::Ineligible { details, .. } => serde_json::to_value(details).ok(),
            Self::TransactionStateInvalid { transaction_id }
            | Self::TransactionAlreadyTransferred { transaction_id }
            | Self::TransactionAlreadyPaidOut { transaction_id } => {
                Some(json!({ "transaction_id": transaction_id }))
            }
            Self::AmountBalanceMismatch { requested, balance } => {
                Some(json!({ "requested": requested, "balance": balance }))
            }
            Self::CurrencyMismatch { requested, expected } => {
                Some(json!({ "requested": requested, "expected": expected }))
            }
            Self::Psp { payout_id, source } => Some(json!({
                "payout_id": payout_id,
                "provider_code": source.provider_code,
            })),
            _ => None,
        }
    }

    pub(crate) fn ineligible(reason: IneligibleReason) -> Self {
        Self::Ineligible {
            reason,
            details: EligibilityDetails::default(),
        }
    }
}

impl From<PayoutError> for AppError {
    fn from(err: PayoutError) -> Self {
        let code = err.error_code();
        match err {
            PayoutError::Lock(e) => Self::Conflict {
                code,
                message: e.to_string(),
            },
            e @ PayoutError::Psp { .. } => Self::ExternalService {
                code,
                message: e.to_string(),
            },
            PayoutError::Store(StoreError::NotFound { entity, id }) => {
                Self::NotFound(format!("{entity} {id}"))
            }
            PayoutError::Store(e) => Self::Database(e.to_string()),
            e => Self::Precondition {
                code,
                details: e.details(),
                message: e.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::psp::PspErrorKind;

    #[test]
    fn test_ineligible_uses_reason_code() {
        let err = PayoutError::ineligible(IneligibleReason::AlreadyPaidOutToday);
        assert_eq!(err.error_code(), "ALREADY_PAID_OUT_TODAY");
        assert_eq!(err.http_status_code(), 400);
        assert!(err.is_precondition());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_verifier_errors() {
        let id = LedgerTransactionId::new(3);
        assert_eq!(
            PayoutError::TransactionStateInvalid { transaction_id: id }.error_code(),
            "TRANSACTION_STATE_INVALID"
        );
        assert_eq!(
            PayoutError::TransactionAlreadyTransferred { transaction_id: id }.error_code(),
            "TRANSACTION_ALREADY_TRANSFERRED"
        );
        assert_eq!(
            PayoutError::TransactionAlreadyPaidOut { transaction_id: id }.error_code(),
            "TRANSACTION_ALREADY_PAID_OUT"
        );
        let mismatch = PayoutError::AmountBalanceMismatch {
            requested: 100,
            balance: 90,
        };
        assert_eq!(mismatch.error_code(), "AMOUNT_BALANCE_MISMATCH");
        assert_eq!(mismatch.details().unwrap()["balance"], 90);
    }

    #[test]
    fn test_lock_error_is_retryable_conflict() {
        let err = PayoutError::from(LockError::Timeout {
            key: "payout_account:1".to_string(),
            waited_ms: 5000,
        });
        assert_eq!(err.error_code(), "LOCK_ACQUIRE_FAILED");
        assert_eq!(err.http_status_code(), 409);
        assert!(err.is_retryable());

        let app: AppError = err.into();
        assert_eq!(app.status_code(), 409);
        assert_eq!(app.error_code(), "LOCK_ACQUIRE_FAILED");
    }

    #[test]
    fn test_psp_error_maps_to_external_service() {
        let err = PayoutError::Psp {
            payout_id: PayoutId::new(9),
            source: PspError::new(PspErrorKind::CardDeclined, "declined"),
        };
        assert_eq!(err.error_code(), "PSP_CARD_DECLINED");
        assert_eq!(err.details().unwrap()["payout_id"], 9);

        let app: AppError = err.into();
        assert_eq!(app.status_code(), 502);
        assert_eq!(app.error_code(), "PSP_CARD_DECLINED");
    }

    #[test]
    fn test_precondition_maps_with_details() {
        let app: AppError = PayoutError::CurrencyMismatch {
            requested: "cad".to_string(),
            expected: "usd".to_string(),
        }
        .into();
        let body = app.to_body();
        assert_eq!(body["error"], "CURRENCY_MISMATCH");
        assert_eq!(body["details"]["expected"], "usd");
    }

    #[test]
    fn test_store_errors_map() {
        let app: AppError =
            PayoutError::from(StoreError::not_found("payout", PayoutId::new(1))).into();
        assert_eq!(app.status_code(), 404);
        let app: AppError = PayoutError::from(StoreError::Database("down".to_string())).into();
        assert_eq!(app.status_code(), 500);
        assert_eq!(app.to_body()["message"], "An internal error occurred");
    }
}
