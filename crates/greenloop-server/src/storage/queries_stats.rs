//! Aggregate queries behind the statistics screens.

use serde::Serialize;

use greenloop_core::BookingStatus;
use greenloop_core::db::DatabaseError;

use super::db::MarketDatabase;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct StatusCount {
    pub status: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct WasteTotal {
    pub waste_type: String,
    pub quantity_kg: f64,
}

const SELLER_SCOPE: &str = "seller_id = ?";
const BUYER_SCOPE: &str =
    "company_name IN (SELECT company_name FROM companies WHERE buyer_id = ?)";

impl MarketDatabase {
    /// Booking counts per status for a seller's own bookings.
    pub async fn seller_status_counts(
        &self,
        seller_id: &str,
    ) -> Result<Vec<StatusCount>, DatabaseError> {
        self.status_counts(SELLER_SCOPE, seller_id).await
    }

    /// Completed quantity per waste type for a seller.
    pub async fn seller_completed_totals(
        &self,
        seller_id: &str,
    ) -> Result<Vec<WasteTotal>, DatabaseError> {
        self.completed_totals(SELLER_SCOPE, seller_id).await
    }

    /// Request counts per status across a buyer's companies.
    pub async fn buyer_status_counts(
        &self,
        buyer_id: &str,
    ) -> Result<Vec<StatusCount>, DatabaseError> {
        self.status_counts(BUYER_SCOPE, buyer_id).await
    }

    /// Completed quantity per waste type across a buyer's companies.
    pub async fn buyer_completed_totals(
        &self,
        buyer_id: &str,
    ) -> Result<Vec<WasteTotal>, DatabaseError> {
        self.completed_totals(BUYER_SCOPE, buyer_id).await
    }

    async fn status_counts(
        &self,
        scope: &'static str,
        owner_id: &str,
    ) -> Result<Vec<StatusCount>, DatabaseError> {
        let sql = format!(
            "SELECT status, COUNT(*) AS count FROM bookings WHERE {scope} GROUP BY status ORDER BY status"
        );
        let counts = sqlx::query_as::<_, StatusCount>(&sql)
            .bind(owner_id)
            .fetch_all(self.pool())
            .await?;

        Ok(counts)
    }

    async fn completed_totals(
        &self,
        scope: &'static str,
        owner_id: &str,
    ) -> Result<Vec<WasteTotal>, DatabaseError> {
        let sql = format!(
            "SELECT waste_type, SUM(quantity_kg) AS quantity_kg FROM bookings WHERE {scope} AND status = ? GROUP BY waste_type ORDER BY waste_type"
        );
        let totals = sqlx::query_as::<_, WasteTotal>(&sql)
            .bind(owner_id)
            .bind(BookingStatus::Completed.as_str())
            .fetch_all(self.pool())
            .await?;

        Ok(totals)
    }
}
