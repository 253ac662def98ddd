//! Data models for marketplace storage.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use greenloop_core::{BookingStatus, Error};

/// Account role chosen at registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Seller,
    Buyer,
}

impl Role {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Seller => "seller",
            Self::Buyer => "buyer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "seller" => Ok(Self::Seller),
            "buyer" => Ok(Self::Buyer),
            other => Err(Error::UnknownVariant {
                kind: "role",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: String,
    pub email: String,
    pub display_name: String,
    pub role: String,
    pub password_hash: String,
    pub profile_image_url: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl User {
    pub fn role(&self) -> Result<Role, Error> {
        self.role.parse()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Token {
    pub id: String,
    pub user_id: String,
    pub token_hash: String,
    pub expires_at: i64,
    pub revoked: i64,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PasswordReset {
    pub token_hash: String,
    pub user_id: String,
    pub expires_at: i64,
    pub used: i64,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Company {
    pub id: String,
    pub company_name: String,
    pub location: String,
    pub contact_number: String,
    /// JSON array of lowercase waste type names.
    pub waste_types_accepted: String,
    pub price_per_kg: f64,
    pub description: String,
    pub buyer_id: String,
    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Company {
    pub fn waste_types(&self) -> Result<Vec<String>, Error> {
        Ok(serde_json::from_str(&self.waste_types_accepted)?)
    }

    /// Whether the company takes `waste_type` (case-insensitive).
    pub fn accepts(&self, waste_type: &str) -> bool {
        let wanted = waste_type.trim().to_lowercase();
        self.waste_types()
            .is_ok_and(|types| types.iter().any(|t| *t == wanted))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Booking {
    pub id: String,
    pub seller_id: String,
    pub company_name: String,
    pub waste_type: String,
    pub quantity_kg: f64,
    pub pickup_date: String,
    pub time_slot: String,
    pub status: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Booking {
    pub fn status(&self) -> Result<BookingStatus, Error> {
        self.status.parse()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Wallet {
    pub user_id: String,
    pub coin_balance: i64,
    pub cash_balance: i64,
    pub updated_at: i64,
}

impl Wallet {
    /// An all-zero wallet for a user that has never been credited.
    pub const fn empty(user_id: String) -> Self {
        Self {
            user_id,
            coin_balance: 0,
            cash_balance: 0,
            updated_at: 0,
        }
    }
}

/// Kind of ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Award,
    VoucherPurchase,
    Exchange,
}

impl TransactionKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Award => "award",
            Self::VoucherPurchase => "voucher_purchase",
            Self::Exchange => "exchange",
        }
    }
}

impl FromStr for TransactionKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "award" => Ok(Self::Award),
            "voucher_purchase" => Ok(Self::VoucherPurchase),
            "exchange" => Ok(Self::Exchange),
            other => Err(Error::UnknownVariant {
                kind: "transaction kind",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct WalletTransaction {
    pub id: i64,
    pub user_id: String,
    pub kind: String,
    pub coins_delta: i64,
    pub cash_delta: i64,
    pub related_booking_id: Option<String>,
    pub waste_type: Option<String>,
    pub voucher_title: Option<String>,
    pub created_at: i64,
}

impl WalletTransaction {
    pub fn kind(&self) -> Result<TransactionKind, Error> {
        self.kind.parse()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PurchasedVoucher {
    pub user_id: String,
    pub title: String,
    pub description: String,
    pub coin_cost: i64,
    pub brand: String,
    pub purchased_at: i64,
}
