//! Core business logic for instant payouts.
//!
//! This crate contains pure orchestration logic with ZERO web or database
//! dependencies. Storage, the payment service provider and lock backends are
//! reached through traits implemented by `payout-db` and `payout-psp`.
//!
//! # Modules
//!
//! - `domain` - Ledger records the engine reads and writes
//! - `store` - Storage traits and the in-memory ledger
//! - `psp` - Provider gateway trait and error taxonomy
//! - `lock` - Per-account mutual exclusion
//! - `instant_payout` - Eligibility, creation, submission, retry and stream

pub mod domain;
pub mod instant_payout;
pub mod lock;
pub mod psp;
pub mod store;
