//! Green coin reward rules.
//!
//! The voucher catalog and the arithmetic behind purchases and coin-to-cash
//! exchange. Balances themselves are stored and mutated by the server; these
//! functions only validate and quote.

use serde::{Deserialize, Serialize};

/// Tunable reward parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardPolicy {
    /// Coins credited to a seller when one of their bookings completes.
    pub coins_per_completion: i64,
    /// Coins needed for one unit of cash.
    pub coins_per_cash_unit: i64,
    /// Smallest number of coins accepted by a single exchange.
    pub min_exchange_coins: i64,
}

impl Default for RewardPolicy {
    fn default() -> Self {
        Self {
            coins_per_completion: 1,
            coins_per_cash_unit: 5,
            min_exchange_coins: 5,
        }
    }
}

/// Why a reward operation was refused. Balances are left untouched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RewardError {
    #[error("insufficient coins: {required} required, {available} available")]
    InsufficientCoins { required: i64, available: i64 },

    #[error("exchange of {requested} coins is below the minimum of {minimum}")]
    BelowMinimumExchange { requested: i64, minimum: i64 },
}

/// Result of pricing an exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExchangeQuote {
    pub coins_debited: i64,
    pub cash_credited: i64,
}

impl RewardPolicy {
    /// Check that the policy can be applied.
    pub fn validate(&self) -> Result<(), String> {
        if self.coins_per_completion <= 0 {
            return Err("coins_per_completion must be positive".into());
        }
        if self.coins_per_cash_unit <= 0 {
            return Err("coins_per_cash_unit must be positive".into());
        }
        if self.min_exchange_coins < self.coins_per_cash_unit {
            return Err("min_exchange_coins must cover at least one cash unit".into());
        }
        Ok(())
    }

    /// Price exchanging `coins` out of a balance of `balance`.
    ///
    /// The full `coins` amount is debited; cash is credited by whole units
    /// only (`coins / coins_per_cash_unit`, rounded down).
    pub fn quote_exchange(&self, coins: i64, balance: i64) -> Result<ExchangeQuote, RewardError> {
        if coins < self.min_exchange_coins {
            return Err(RewardError::BelowMinimumExchange {
                requested: coins,
                minimum: self.min_exchange_coins,
            });
        }
        if coins > balance {
            return Err(RewardError::InsufficientCoins {
                required: coins,
                available: balance,
            });
        }
        Ok(ExchangeQuote {
            coins_debited: coins,
            cash_credited: coins.checked_div(self.coins_per_cash_unit).unwrap_or(0),
        })
    }
}

/// Check a voucher purchase against a balance, returning the balance after
/// the debit.
pub const fn check_purchase(balance: i64, cost: i64) -> Result<i64, RewardError> {
    if balance < cost {
        return Err(RewardError::InsufficientCoins {
            required: cost,
            available: balance,
        });
    }
    Ok(balance - cost)
}

/// A redeemable catalog item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Voucher {
    /// Unique within the catalog and within a user's purchased set.
    pub title: &'static str,
    pub description: &'static str,
    pub coin_cost: i64,
    pub brand: &'static str,
}

/// The fixed voucher catalog.
pub const CATALOG: [Voucher; 6] = [
    Voucher {
        title: "Reusable Tote Bag",
        description: "Organic cotton tote bag, delivered to your door",
        coin_cost: 3,
        brand: "EcoCarry",
    },
    Voucher {
        title: "10% Grocery Discount",
        description: "10% off one grocery order",
        coin_cost: 5,
        brand: "FreshMart",
    },
    Voucher {
        title: "Free Coffee",
        description: "One medium coffee in a reusable cup",
        coin_cost: 8,
        brand: "Bean There",
    },
    Voucher {
        title: "Plant a Tree",
        description: "A sapling planted in your name",
        coin_cost: 10,
        brand: "TreeNation",
    },
    Voucher {
        title: "Metro Day Pass",
        description: "Unlimited public transport for one day",
        coin_cost: 15,
        brand: "CityTransit",
    },
    Voucher {
        title: "Solar Power Bank",
        description: "10,000 mAh solar charging power bank",
        coin_cost: 40,
        brand: "SunCharge",
    },
];

/// The catalog in display order (cheapest first).
pub fn catalog() -> &'static [Voucher] {
    &CATALOG
}

/// Look up a catalog voucher by title.
pub fn find_voucher(title: &str) -> Option<&'static Voucher> {
    CATALOG.iter().find(|v| v.title == title)
}
