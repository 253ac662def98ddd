//! Pickup bookings and their status lifecycle.

use tracing::{info, instrument, warn};

use greenloop_core::db::DatabaseError;
use greenloop_core::lifecycle::transition;
use greenloop_core::{Actor, BookingAction, BookingStatus, Transition, TransitionError};

use super::{Market, MarketError, Result, Subscription};
use crate::storage::{
    AwardParams, Booking, BookingParams, Role, TransitionOutcome, TransitionParams,
};

/// Booking fields as submitted by a seller.
#[derive(Debug, Clone, Default)]
pub struct BookingForm {
    pub company_name: String,
    pub waste_type: String,
    pub quantity_kg: f64,
    pub pickup_date: String,
    pub time_slot: String,
}

impl BookingForm {
    fn normalized(&self) -> Result<Self> {
        let form = Self {
            company_name: self.company_name.trim().to_string(),
            waste_type: self.waste_type.trim().to_lowercase(),
            quantity_kg: self.quantity_kg,
            pickup_date: self.pickup_date.trim().to_string(),
            time_slot: self.time_slot.trim().to_string(),
        };
        if form.company_name.is_empty() {
            return Err(MarketError::InvalidArgument("Company name is required".into()));
        }
        if form.waste_type.is_empty() {
            return Err(MarketError::InvalidArgument("Waste type is required".into()));
        }
        if !form.quantity_kg.is_finite() || form.quantity_kg <= 0.0 {
            return Err(MarketError::InvalidArgument(
                "Quantity must be greater than zero".into(),
            ));
        }
        if form.pickup_date.is_empty() || form.time_slot.is_empty() {
            return Err(MarketError::InvalidArgument(
                "Pickup date and time slot are required".into(),
            ));
        }
        Ok(form)
    }
}

/// Pick the first role of the caller under which `action` is allowed.
///
/// `None` when the caller is no party to the booking.
fn decide(
    status: BookingStatus,
    action: BookingAction,
    actors: &[Actor],
) -> Option<std::result::Result<Transition, TransitionError>> {
    let mut rejection = None;
    for &actor in actors {
        match transition(status, action, actor) {
            Ok(t) => return Some(Ok(t)),
            Err(e) => {
                rejection.get_or_insert(e);
            }
        }
    }
    rejection.map(Err)
}

impl Market {
    #[instrument(skip(self, form))]
    pub async fn create_booking(&self, seller_id: &str, form: &BookingForm) -> Result<Booking> {
        self.require_role(seller_id, Role::Seller).await?;
        let form = form.normalized()?;

        let companies = self.db.active_companies_named(&form.company_name).await?;
        if companies.is_empty() {
            return Err(MarketError::NotFound(format!(
                "Active company {}",
                form.company_name
            )));
        }
        if !companies.iter().any(|c| c.accepts(&form.waste_type)) {
            return Err(MarketError::InvalidArgument(format!(
                "{} does not accept {}",
                form.company_name, form.waste_type
            )));
        }

        let id = uuid::Uuid::new_v4().to_string();
        let booking = self
            .db
            .create_booking(&BookingParams {
                id: &id,
                seller_id,
                company_name: &form.company_name,
                waste_type: &form.waste_type,
                quantity_kg: form.quantity_kg,
                pickup_date: &form.pickup_date,
                time_slot: &form.time_slot,
            })
            .await?;
        info!(booking_id = %booking.id, company = %booking.company_name, "Booking created");

        self.refresh_seller_feed(seller_id).await;
        self.refresh_pickup_feeds_for(&booking.company_name).await;
        Ok(booking)
    }

    pub async fn list_bookings_for_seller(&self, seller_id: &str) -> Result<Vec<Booking>> {
        Ok(self.db.list_bookings_for_seller(seller_id).await?)
    }

    /// Bookings made against any company the buyer owns.
    pub async fn list_pickup_requests(&self, buyer_id: &str) -> Result<Vec<Booking>> {
        Ok(self.db.list_pickup_requests(buyer_id).await?)
    }

    /// Apply `action` to a booking on behalf of `caller_id`.
    ///
    /// The caller acts as the seller if they created the booking and as the
    /// buyer if they own a company of that name; when both hold, the seller
    /// role is tried first. Completing a booking credits its seller in the
    /// same transaction as the status write.
    #[instrument(skip(self))]
    pub async fn transition_booking(
        &self,
        caller_id: &str,
        booking_id: &str,
        action: BookingAction,
    ) -> Result<TransitionOutcome> {
        self.require_user(caller_id).await?;
        let booking = self.db.get_booking(booking_id).await?;
        let status = booking.status()?;

        let mut actors = Vec::with_capacity(2);
        if booking.seller_id == caller_id {
            actors.push(Actor::Seller);
        }
        if self
            .db
            .owns_company_named(caller_id, &booking.company_name)
            .await?
        {
            actors.push(Actor::Buyer);
        }

        let decision = decide(status, action, &actors).ok_or_else(|| {
            MarketError::Forbidden(format!("Not a party to booking {booking_id}"))
        })?;
        let t = decision.map_err(|e| {
            warn!(booking_id, %action, error = %e, "Transition rejected");
            MarketError::InvalidTransition {
                booking_id: booking_id.to_string(),
                reason: e.to_string(),
            }
        })?;

        let award = t.awards_coins.then(|| AwardParams {
            seller_id: &booking.seller_id,
            waste_type: &booking.waste_type,
            coins: self.policy.coins_per_completion,
        });

        let outcome = self
            .db
            .apply_transition(&TransitionParams {
                booking_id,
                from: t.from,
                to: t.to,
                award,
            })
            .await
            .map_err(|e| match e {
                DatabaseError::Conflict(reason) => {
                    warn!(booking_id, %action, "Booking changed concurrently");
                    MarketError::InvalidTransition {
                        booking_id: booking_id.to_string(),
                        reason,
                    }
                }
                other => other.into(),
            })?;

        info!(
            booking_id,
            from = %t.from,
            to = %t.to,
            coins_awarded = outcome.coins_awarded,
            "Booking transitioned"
        );

        if outcome.coins_awarded > 0 {
            #[cfg(feature = "metrics")]
            self.metrics
                .record_award(outcome.coins_awarded, &booking.waste_type);
            self.refresh_wallet_feed(&booking.seller_id).await;
        }
        self.refresh_seller_feed(&booking.seller_id).await;
        self.refresh_pickup_feeds_for(&booking.company_name).await;

        Ok(outcome)
    }

    /// Delete every booking the seller created.
    #[instrument(skip(self))]
    pub async fn clear_bookings(&self, seller_id: &str) -> Result<u64> {
        self.require_user(seller_id).await?;
        let companies: Vec<String> = self
            .db
            .list_bookings_for_seller(seller_id)
            .await?
            .into_iter()
            .map(|b| b.company_name)
            .collect();

        let removed = self.db.clear_bookings_for_seller(seller_id).await?;
        info!(seller_id, removed, "Bookings cleared");

        self.refresh_seller_feed(seller_id).await;
        let mut seen: Vec<&str> = Vec::new();
        for name in &companies {
            if !seen.contains(&name.as_str()) {
                seen.push(name);
                self.refresh_pickup_feeds_for(name).await;
            }
        }
        Ok(removed)
    }

    /// Live view of the seller's own bookings.
    pub async fn watch_seller_bookings(&self, seller_id: &str) -> Result<Subscription<Vec<Booking>>> {
        self.require_user(seller_id).await?;
        let rx = self.seller_bookings.subscribe(seller_id).await;
        let initial = self.db.list_bookings_for_seller(seller_id).await?;
        Ok(Subscription::new(initial, rx))
    }

    /// Live view of pickup requests against the buyer's companies.
    pub async fn watch_pickup_requests(&self, buyer_id: &str) -> Result<Subscription<Vec<Booking>>> {
        self.require_user(buyer_id).await?;
        let rx = self.pickup_requests.subscribe(buyer_id).await;
        let initial = self.db.list_pickup_requests(buyer_id).await?;
        Ok(Subscription::new(initial, rx))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn seller_role_is_tried_before_buyer() {
        // Pending + Complete is only open to the seller.
        let t = decide(
            BookingStatus::Pending,
            BookingAction::Complete,
            &[Actor::Seller, Actor::Buyer],
        );
        assert!(matches!(t, Some(Ok(_))));

        // Confirm is only open to the buyer; the seller rejection is skipped.
        let t = decide(
            BookingStatus::Pending,
            BookingAction::Confirm,
            &[Actor::Seller, Actor::Buyer],
        );
        assert!(matches!(t, Some(Ok(Transition { to: BookingStatus::Confirmed, .. }))));
    }

    #[test]
    fn no_role_means_no_decision() {
        assert!(decide(BookingStatus::Pending, BookingAction::Cancel, &[]).is_none());
    }

    #[test]
    fn first_rejection_is_reported() {
        let t = decide(
            BookingStatus::Confirmed,
            BookingAction::Cancel,
            &[Actor::Seller],
        );
        assert!(matches!(
            t,
            Some(Err(TransitionError::NotAllowed {
                actor: Actor::Seller,
                ..
            }))
        ));
    }

    #[test]
    fn form_is_trimmed_and_checked() {
        let form = BookingForm {
            company_name: " Acme ".into(),
            waste_type: " Plastic".into(),
            quantity_kg: 2.5,
            pickup_date: "2025-03-01".into(),
            time_slot: "morning".into(),
        }
        .normalized()
        .unwrap();
        assert_eq!(form.company_name, "Acme");
        assert_eq!(form.waste_type, "plastic");

        let zero = BookingForm {
            quantity_kg: 0.0,
            ..form.clone()
        };
        assert!(matches!(
            zero.normalized(),
            Err(MarketError::InvalidArgument(_))
        ));
        let nan = BookingForm {
            quantity_kg: f64::NAN,
            ..form
        };
        assert!(nan.normalized().is_err());
    }
}
