//! Aggregates for the statistics screens.

use serde::Serialize;

use super::{Market, Result};
use crate::storage::{StatusCount, WasteTotal};

#[derive(Debug, Clone, Serialize)]
pub struct SellerStats {
    pub by_status: Vec<StatusCount>,
    pub completed_by_waste_type: Vec<WasteTotal>,
    pub coins_earned: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct BuyerStats {
    pub by_status: Vec<StatusCount>,
    pub completed_by_waste_type: Vec<WasteTotal>,
}

impl Market {
    pub async fn seller_stats(&self, seller_id: &str) -> Result<SellerStats> {
        self.require_user(seller_id).await?;
        Ok(SellerStats {
            by_status: self.db.seller_status_counts(seller_id).await?,
            completed_by_waste_type: self.db.seller_completed_totals(seller_id).await?,
            coins_earned: self.db.coins_earned(seller_id).await?,
        })
    }

    pub async fn buyer_stats(&self, buyer_id: &str) -> Result<BuyerStats> {
        self.require_user(buyer_id).await?;
        Ok(BuyerStats {
            by_status: self.db.buyer_status_counts(buyer_id).await?,
            completed_by_waste_type: self.db.buyer_completed_totals(buyer_id).await?,
        })
    }
}
