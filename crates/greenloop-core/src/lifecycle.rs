//! Booking status lifecycle.
//!
//! A booking starts `Pending` and ends `Completed` or `Cancelled`. Which
//! party may move it along which edge:
//!
//! | from      | action   | actor  | to        | coins |
//! |-----------|----------|--------|-----------|-------|
//! | Pending   | Confirm  | Buyer  | Confirmed | no    |
//! | Pending   | Cancel   | either | Cancelled | no    |
//! | Pending   | Complete | Seller | Completed | yes   |
//! | Confirmed | Complete | Buyer  | Completed | yes   |
//! | Confirmed | Cancel   | Buyer  | Cancelled | no    |
//!
//! Everything else is rejected. This module only decides; persisting the new
//! status and crediting the seller happen together in the server's storage
//! layer.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Status of a pickup booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl BookingStatus {
    pub const ALL: [Self; 4] = [
        Self::Pending,
        Self::Confirmed,
        Self::Completed,
        Self::Cancelled,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    /// No transition leaves a terminal status.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(Error::UnknownVariant {
                kind: "booking status",
                value: other.to_string(),
            }),
        }
    }
}

/// The party requesting a status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Actor {
    /// The seller who created the booking.
    Seller,
    /// The owner of a company the booking was made against.
    Buyer,
}

impl Actor {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Seller => "seller",
            Self::Buyer => "buyer",
        }
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Requested change to a booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingAction {
    /// Buyer accepts the pickup.
    Confirm,
    /// Seller withdraws, or buyer rejects.
    Cancel,
    /// Pickup happened ("Done" for the seller, "Completed" for the buyer).
    Complete,
}

impl BookingAction {
    pub const ALL: [Self; 3] = [Self::Confirm, Self::Cancel, Self::Complete];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Confirm => "confirm",
            Self::Cancel => "cancel",
            Self::Complete => "complete",
        }
    }
}

impl fmt::Display for BookingAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An accepted status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: BookingStatus,
    pub to: BookingStatus,
    /// Whether reaching `to` credits the seller's wallet.
    pub awards_coins: bool,
}

/// A rejected status change.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("booking is already {status}")]
    Terminal { status: BookingStatus },

    #[error("{actor} cannot {action} a {status} booking")]
    NotAllowed {
        status: BookingStatus,
        action: BookingAction,
        actor: Actor,
    },
}

/// Decide whether `actor` may apply `action` to a booking in status `from`.
pub fn transition(
    from: BookingStatus,
    action: BookingAction,
    actor: Actor,
) -> Result<Transition, TransitionError> {
    use Actor::{Buyer, Seller};
    use BookingAction::{Cancel, Complete, Confirm};
    use BookingStatus::{Cancelled, Completed, Confirmed, Pending};

    if from.is_terminal() {
        return Err(TransitionError::Terminal { status: from });
    }

    let (to, awards_coins) = match (from, action, actor) {
        (Pending, Confirm, Buyer) => (Confirmed, false),
        (Pending, Cancel, _) | (Confirmed, Cancel, Buyer) => (Cancelled, false),
        (Pending, Complete, Seller) | (Confirmed, Complete, Buyer) => (Completed, true),
        _ => {
            return Err(TransitionError::NotAllowed {
                status: from,
                action,
                actor,
            });
        }
    };

    Ok(Transition {
        from,
        to,
        awards_coins,
    })
}
