//! `SeaORM` entities for the payout ledger tables.
//!
//! Enum-like columns are stored as text and parsed into `payout-core`
//! domain enums by the repositories.

pub mod payout_accounts;
pub mod payout_cards;
pub mod payout_locks;
pub mod payout_methods;
pub mod payouts;
pub mod pgp_sub_accounts;
pub mod psp_payout_requests;
pub mod topup_transfers;
pub mod transactions;
