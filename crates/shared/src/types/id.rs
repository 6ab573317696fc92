//! Typed IDs for type-safe entity references.
//!
//! Ledger rows are keyed by database-assigned `BIGSERIAL` ids. Wrapping them
//! prevents accidentally passing a `PayoutId` where a `PayoutAccountId` is
//! expected.

use serde::{Deserialize, Serialize};

/// Macro to generate typed ID wrappers around `i64`.
macro_rules! typed_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            /// Wraps a raw database id.
            #[must_use]
            pub const fn new(raw: i64) -> Self {
                Self(raw)
            }

            /// Returns the raw database id.
            #[must_use]
            pub const fn into_inner(self) -> i64 {
                self.0
            }
        }

        impl From<i64> for $name {
            fn from(raw: i64) -> Self {
                Self(raw)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(s.parse()?))
            }
        }
    };
}

typed_id!(PayoutAccountId, "Unique identifier for a payout account.");
typed_id!(
    PgpSubAccountId,
    "Unique identifier for a PSP-held sub-account record."
);
typed_id!(
    PayoutMethodId,
    "Unique identifier shared by a payout method and its card record."
);
typed_id!(PayoutId, "Unique identifier for a payout attempt.");
typed_id!(
    LedgerTransactionId,
    "Unique identifier for a ledger transaction owed to a payout account."
);
typed_id!(TopUpTransferId, "Unique identifier for a top-up transfer record.");
typed_id!(
    PspPayoutRequestId,
    "Unique identifier for a PSP payout request audit row."
);

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
