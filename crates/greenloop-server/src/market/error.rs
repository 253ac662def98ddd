//! Errors surfaced by marketplace operations.

use greenloop_core::RewardError;
use greenloop_core::db::DatabaseError;

use crate::storage::LedgerError;

#[derive(Debug, thiserror::Error)]
pub enum MarketError {
    #[error("Invalid transition for booking {booking_id}: {reason}")]
    InvalidTransition { booking_id: String, reason: String },

    #[error("Insufficient coins: {required} required, {available} available")]
    InsufficientCoins { required: i64, available: i64 },

    #[error("Exchange of {requested} coins is below the minimum of {minimum}")]
    BelowMinimumExchange { requested: i64, minimum: i64 },

    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Store write failed: {0}")]
    RemoteWrite(DatabaseError),
}

impl From<DatabaseError> for MarketError {
    fn from(e: DatabaseError) -> Self {
        match e {
            DatabaseError::NotFound(what) => Self::NotFound(what),
            other => Self::RemoteWrite(other),
        }
    }
}

impl From<RewardError> for MarketError {
    fn from(e: RewardError) -> Self {
        match e {
            RewardError::InsufficientCoins {
                required,
                available,
            } => Self::InsufficientCoins {
                required,
                available,
            },
            RewardError::BelowMinimumExchange { requested, minimum } => {
                Self::BelowMinimumExchange { requested, minimum }
            }
        }
    }
}

impl From<LedgerError> for MarketError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::Rejected(r) => r.into(),
            LedgerError::Database(d) => d.into(),
        }
    }
}

/// A stored row that no longer parses.
impl From<greenloop_core::Error> for MarketError {
    fn from(e: greenloop_core::Error) -> Self {
        Self::RemoteWrite(e.into())
    }
}
