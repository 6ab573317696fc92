//! Shared types, errors, and configuration for the payout service.
//!
//! This crate provides common types used across all other crates:
//! - Typed integer IDs for type-safe ledger references
//! - Offset pagination types for stream endpoints
//! - The API-facing error envelope
//! - Configuration management

pub mod config;
pub mod error;
pub mod types;

pub use config::{AppConfig, InstantPayoutConfig, LockBackend, LockConfig};
pub use error::{AppError, AppResult};
