//! Payment service provider gateway for instant payouts.
//!
//! Implements [`payout_core::psp::PspGateway`] against a Stripe-compatible
//! REST API and translates every provider failure into
//! [`payout_core::psp::PspErrorKind`].
//!
//! # Modules
//!
//! - `stripe` - HTTP gateway
//! - `classify` - Provider error translation

pub mod classify;
pub mod stripe;

pub use stripe::StripeGateway;
