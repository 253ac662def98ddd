//! `GreenLoop` Core Library
//!
//! Shared functionality for the `GreenLoop` marketplace backend:
//! - Booking status lifecycle (who may move a booking where)
//! - Reward rules: voucher catalog, purchase checks, coin exchange
//! - Configuration resolution and hierarchy
//! - `SQLite` pool helpers and common error types

pub mod config;
pub mod db;
pub mod error;
pub mod lifecycle;
#[cfg(feature = "metrics")]
pub mod metrics;
pub mod rewards;
pub mod tracing_init;

pub use config::Config;
pub use error::{Error, Result};
pub use lifecycle::{Actor, BookingAction, BookingStatus, Transition, TransitionError};
pub use rewards::{ExchangeQuote, RewardError, RewardPolicy, Voucher};
