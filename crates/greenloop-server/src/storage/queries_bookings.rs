//! Booking record queries.

use greenloop_core::BookingStatus;
use greenloop_core::db::{DatabaseError, unix_timestamp};

use super::db::MarketDatabase;
use super::models::Booking;
use super::queries_wallet::credit_award;

/// Parameters for inserting a booking.
pub struct BookingParams<'a> {
    pub id: &'a str,
    pub seller_id: &'a str,
    pub company_name: &'a str,
    pub waste_type: &'a str,
    pub quantity_kg: f64,
    pub pickup_date: &'a str,
    pub time_slot: &'a str,
}

/// Coins to credit when a transition completes a booking.
pub struct AwardParams<'a> {
    pub seller_id: &'a str,
    pub waste_type: &'a str,
    pub coins: i64,
}

/// A status change already accepted by the lifecycle rules.
pub struct TransitionParams<'a> {
    pub booking_id: &'a str,
    /// Status the decision was made against; the write only applies if the
    /// row still holds it.
    pub from: BookingStatus,
    pub to: BookingStatus,
    pub award: Option<AwardParams<'a>>,
}

#[derive(Debug, Clone)]
pub struct TransitionOutcome {
    pub booking: Booking,
    /// Zero unless this call credited the seller.
    pub coins_awarded: i64,
}

impl MarketDatabase {
    /// Insert a new `pending` booking.
    pub async fn create_booking(&self, params: &BookingParams<'_>) -> Result<Booking, DatabaseError> {
        let now = unix_timestamp();

        sqlx::query(
            "INSERT INTO bookings (id, seller_id, company_name, waste_type, quantity_kg, pickup_date, time_slot, status, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(params.id)
        .bind(params.seller_id)
        .bind(params.company_name)
        .bind(params.waste_type)
        .bind(params.quantity_kg)
        .bind(params.pickup_date)
        .bind(params.time_slot)
        .bind(BookingStatus::Pending.as_str())
        .bind(now)
        .bind(now)
        .execute(self.pool())
        .await?;

        self.get_booking(params.id).await
    }

    /// Get a booking by ID.
    pub async fn get_booking(&self, id: &str) -> Result<Booking, DatabaseError> {
        sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Booking {id}")))
    }

    /// Bookings created by a seller, newest first.
    pub async fn list_bookings_for_seller(
        &self,
        seller_id: &str,
    ) -> Result<Vec<Booking>, DatabaseError> {
        let bookings = sqlx::query_as::<_, Booking>(
            "SELECT * FROM bookings WHERE seller_id = ? ORDER BY created_at DESC, rowid DESC",
        )
        .bind(seller_id)
        .fetch_all(self.pool())
        .await?;

        Ok(bookings)
    }

    /// Bookings made against any company the buyer owns, newest first.
    pub async fn list_pickup_requests(&self, buyer_id: &str) -> Result<Vec<Booking>, DatabaseError> {
        let bookings = sqlx::query_as::<_, Booking>(
            "SELECT * FROM bookings WHERE company_name IN (SELECT company_name FROM companies WHERE buyer_id = ?) ORDER BY created_at DESC, rowid DESC",
        )
        .bind(buyer_id)
        .fetch_all(self.pool())
        .await?;

        Ok(bookings)
    }

    /// Delete every booking of a seller. Ledger entries are kept.
    pub async fn clear_bookings_for_seller(&self, seller_id: &str) -> Result<u64, DatabaseError> {
        let result = sqlx::query("DELETE FROM bookings WHERE seller_id = ?")
            .bind(seller_id)
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected())
    }

    /// Write a status change and its award in one transaction.
    ///
    /// Returns `Conflict` without writing anything if the booking no longer
    /// holds `params.from`.
    pub async fn apply_transition(
        &self,
        params: &TransitionParams<'_>,
    ) -> Result<TransitionOutcome, DatabaseError> {
        let now = unix_timestamp();
        let mut tx = self.pool().begin().await?;

        let result = sqlx::query(
            "UPDATE bookings SET status = ?, updated_at = ? WHERE id = ? AND status = ?",
        )
        .bind(params.to.as_str())
        .bind(now)
        .bind(params.booking_id)
        .bind(params.from.as_str())
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::Conflict(format!(
                "Booking {} is no longer {}",
                params.booking_id, params.from
            )));
        }

        let mut coins_awarded = 0;
        if let Some(award) = &params.award
            && credit_award(
                &mut *tx,
                award.seller_id,
                params.booking_id,
                award.waste_type,
                award.coins,
            )
            .await?
        {
            coins_awarded = award.coins;
        }

        let booking = sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = ?")
            .bind(params.booking_id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(TransitionOutcome {
            booking,
            coins_awarded,
        })
    }
}
