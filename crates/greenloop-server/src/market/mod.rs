//! Marketplace operations.
//!
//! `Market` is the context object behind every gRPC service: it checks who
//! may do what, drives the storage layer and republishes live feeds after
//! each write.

mod bookings;
mod companies;
pub mod error;
pub mod feed;
mod ledger;
mod stats;
mod users;


use tracing::warn;

use greenloop_core::RewardPolicy;

use crate::storage::{Booking, MarketDatabase, Wallet};

pub use bookings::BookingForm;
pub use companies::CompanyForm;
pub use error::MarketError;
pub use feed::{Feed, Subscription};
pub use stats::{BuyerStats, SellerStats};

pub type Result<T> = std::result::Result<T, MarketError>;

pub struct Market {
    db: MarketDatabase,
    policy: RewardPolicy,
    seller_bookings: Feed<Vec<Booking>>,
    pickup_requests: Feed<Vec<Booking>>,
    wallets: Feed<Wallet>,
    #[cfg(feature = "metrics")]
    metrics: greenloop_core::metrics::LedgerMetrics,
}

impl Market {
    pub fn new(db: MarketDatabase, policy: RewardPolicy, feed_capacity: usize) -> Self {
        Self {
            db,
            policy,
            seller_bookings: Feed::new("seller_bookings", feed_capacity),
            pickup_requests: Feed::new("pickup_requests", feed_capacity),
            wallets: Feed::new("wallet", feed_capacity),
            #[cfg(feature = "metrics")]
            metrics: greenloop_core::metrics::LedgerMetrics::new(),
        }
    }

    pub const fn db(&self) -> &MarketDatabase {
        &self.db
    }

    // =========================================================================
    // Feed publishing. Failures here are logged, never returned: the write
    // that triggered them has already committed.
    // =========================================================================

    async fn refresh_seller_feed(&self, seller_id: &str) {
        if !self.seller_bookings.has_subscribers(seller_id).await {
            self.seller_bookings.prune(seller_id).await;
            return;
        }
        match self.db.list_bookings_for_seller(seller_id).await {
            Ok(bookings) => {
                self.seller_bookings.publish(seller_id, bookings).await;
            }
            Err(e) => warn!(error = %e, seller_id, "Failed to refresh seller bookings feed"),
        }
    }

    async fn refresh_pickup_feed(&self, buyer_id: &str) {
        if !self.pickup_requests.has_subscribers(buyer_id).await {
            self.pickup_requests.prune(buyer_id).await;
            return;
        }
        match self.db.list_pickup_requests(buyer_id).await {
            Ok(bookings) => {
                self.pickup_requests.publish(buyer_id, bookings).await;
            }
            Err(e) => warn!(error = %e, buyer_id, "Failed to refresh pickup request feed"),
        }
    }

    /// Refresh the pickup feed of every buyer owning a company named
    /// `company_name`.
    async fn refresh_pickup_feeds_for(&self, company_name: &str) {
        match self.db.buyer_ids_for_company_name(company_name).await {
            Ok(buyers) => {
                for buyer_id in buyers {
                    self.refresh_pickup_feed(&buyer_id).await;
                }
            }
            Err(e) => warn!(error = %e, company_name, "Failed to look up company owners"),
        }
    }

    async fn refresh_wallet_feed(&self, user_id: &str) {
        if !self.wallets.has_subscribers(user_id).await {
            self.wallets.prune(user_id).await;
            return;
        }
        match self.db.get_wallet(user_id).await {
            Ok(wallet) => {
                self.wallets.publish(user_id, wallet).await;
            }
            Err(e) => warn!(error = %e, user_id, "Failed to refresh wallet feed"),
        }
    }
}
