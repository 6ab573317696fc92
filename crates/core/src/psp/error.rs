//! Provider error taxonomy.
//!
//! Every provider failure is reduced to one [`PspErrorKind`]. The submitters
//! branch on it exhaustively through [`FailureAction`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Closed set of provider failure classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PspErrorKind {
    /// Network failure or timeout talking to the provider.
    ApiConnection,
    /// Provider throttled the request.
    RateLimit,
    /// Provider-side failure (5xx or generic API error).
    Api,
    /// Connected account balance could not cover the request.
    InsufficientFunds,
    /// Card network refused the destination card.
    CardDeclined,
    /// Provider rejected the request parameters.
    InvalidRequest,
    /// Anything the gateway could not classify.
    Unknown,
}

impl PspErrorKind {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(self) -> &'static str {
        match self {
            Self::ApiConnection => "PSP_API_CONNECTION",
            Self::RateLimit => "PSP_RATE_LIMIT",
            Self::Api => "PSP_API",
            Self::InsufficientFunds => "PSP_INSUFFICIENT_FUNDS",
            Self::CardDeclined => "PSP_CARD_DECLINED",
            Self::InvalidRequest => "PSP_INVALID_REQUEST",
            Self::Unknown => "PSP_UNKNOWN",
        }
    }
}

/// A classified provider failure.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{kind:?} provider error: {message}")]
pub struct PspError {
    /// Failure class.
    pub kind: PspErrorKind,
    /// Provider or transport message.
    pub message: String,
    /// Provider error code such as `card_declined`, when present.
    pub provider_code: Option<String>,
    /// HTTP status returned by the provider, when one was received.
    pub http_status: Option<u16>,
}

impl PspError {
    /// Creates an error of the given kind.
    pub fn new(kind: PspErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            provider_code: None,
            http_status: None,
        }
    }

    /// Attaches the provider error code.
    #[must_use]
    pub fn with_provider_code(mut self, code: impl Into<String>) -> Self {
        self.provider_code = Some(code.into());
        self
    }

    /// Attaches the HTTP status.
    #[must_use]
    pub const fn with_http_status(mut self, status: u16) -> Self {
        self.http_status = Some(status);
        self
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        self.kind.error_code()
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self.kind {
            PspErrorKind::ApiConnection | PspErrorKind::RateLimit => 503,
            _ => 502,
        }
    }

    /// Serialized form stored on payouts and audit rows.
    #[must_use]
    pub fn to_record(&self) -> serde_json::Value {
        serde_json::json!({
            "type": self.kind,
            "code": self.error_code(),
            "message": self.message,
            "provider_code": self.provider_code,
            "http_status": self.http_status,
        })
    }
}

/// What a submitter does with the payout after a provider failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureAction {
    /// Payout to `ERROR`, reserved transactions released.
    MarkErrorAndDetach,
    /// Payout to `FAILED`, reserved transactions released.
    MarkFailedAndDetach,
    /// Payout stays `NEW` with its transactions for the retry job.
    LeaveUntouched,
}

impl FailureAction {
    /// Handling of a failed balance read or top-up transfer.
    #[must_use]
    pub const fn for_topup(kind: PspErrorKind) -> Self {
        match kind {
            PspErrorKind::ApiConnection | PspErrorKind::RateLimit | PspErrorKind::Api => {
                Self::MarkErrorAndDetach
            }
            PspErrorKind::InsufficientFunds
            | PspErrorKind::CardDeclined
            | PspErrorKind::InvalidRequest
            | PspErrorKind::Unknown => Self::LeaveUntouched,
        }
    }

    /// Handling of a failed payout submission.
    ///
    /// Insufficient funds after a top-up is treated like a transient failure.
    #[must_use]
    pub const fn for_payout(kind: PspErrorKind) -> Self {
        match kind {
            PspErrorKind::ApiConnection
            | PspErrorKind::RateLimit
            | PspErrorKind::Api
            | PspErrorKind::InsufficientFunds => Self::MarkErrorAndDetach,
            PspErrorKind::CardDeclined => Self::MarkFailedAndDetach,
            PspErrorKind::InvalidRequest | PspErrorKind::Unknown => Self::LeaveUntouched,
        }
    }

    /// Returns true if the reserved transactions are released.
    #[must_use]
    pub const fn detaches(self) -> bool {
        !matches!(self, Self::LeaveUntouched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(PspErrorKind::ApiConnection, FailureAction::MarkErrorAndDetach)]
    #[case(PspErrorKind::RateLimit, FailureAction::MarkErrorAndDetach)]
    #[case(PspErrorKind::Api, FailureAction::MarkErrorAndDetach)]
    #[case(PspErrorKind::InsufficientFunds, FailureAction::LeaveUntouched)]
    #[case(PspErrorKind::CardDeclined, FailureAction::LeaveUntouched)]
    #[case(PspErrorKind::InvalidRequest, FailureAction::LeaveUntouched)]
    #[case(PspErrorKind::Unknown, FailureAction::LeaveUntouched)]
    fn test_topup_failure_action(#[case] kind: PspErrorKind, #[case] expected: FailureAction) {
        assert_eq!(FailureAction::for_topup(kind), expected);
    }

    #[rstest]
    #[case(PspErrorKind::ApiConnection, FailureAction::MarkErrorAndDetach)]
    #[case(PspErrorKind::RateLimit, FailureAction::MarkErrorAndDetach)]
    #[case(PspErrorKind::Api, FailureAction::MarkErrorAndDetach)]
    #[case(PspErrorKind::InsufficientFunds, FailureAction::MarkErrorAndDetach)]
    #[case(PspErrorKind::CardDeclined, FailureAction::MarkFailedAndDetach)]
    #[case(PspErrorKind::InvalidRequest, FailureAction::LeaveUntouched)]
    #[case(PspErrorKind::Unknown, FailureAction::LeaveUntouched)]
    fn test_payout_failure_action(#[case] kind: PspErrorKind, #[case] expected: FailureAction) {
        assert_eq!(FailureAction::for_payout(kind), expected);
    }

    #[test]
    fn test_error_record_carries_kind_and_code() {
        let err = PspError::new(PspErrorKind::CardDeclined, "Your card was declined.")
            .with_provider_code("card_declined")
            .with_http_status(402);

        let record = err.to_record();

        assert_eq!(record["type"], "card_declined");
        assert_eq!(record["code"], "PSP_CARD_DECLINED");
        assert_eq!(record["provider_code"], "card_declined");
        assert_eq!(record["http_status"], 402);
        assert_eq!(err.http_status_code(), 502);
    }

    #[test]
    fn test_detaches() {
        assert!(FailureAction::MarkErrorAndDetach.detaches());
        assert!(FailureAction::MarkFailedAndDetach.detaches());
        assert!(!FailureAction::LeaveUntouched.detaches());
    }
}
