//! Shared setup for the service test modules.

use std::sync::Arc;

use tonic::Request;

use greenloop_core::RewardPolicy;
use greenloop_proto::v1 as pb;

use crate::auth::claims::Claims;
use crate::market::{CompanyForm, Market};
use crate::storage::{MarketDatabase, Role};

pub const SELLER: &str = "seller-1";
pub const BUYER: &str = "buyer-1";
pub const COMPANY: &str = "Acme Recycling";

/// Access-token claims for `user_id`, as the interceptor would attach them.
pub fn claims_for(user_id: &str, role: Role) -> Claims {
    Claims {
        jti: format!("jti-{user_id}"),
        sub: user_id.into(),
        role: role.as_str().into(),
        iat: 0,
        exp: i64::MAX,
        token_type: "access".into(),
    }
}

/// Wrap `inner` in a request that has passed the interceptor.
pub fn authed<T>(inner: T, user_id: &str, role: Role) -> Request<T> {
    let mut req = Request::new(inner);
    req.extensions_mut().insert(claims_for(user_id, role));
    req
}

pub fn seller_req<T>(inner: T) -> Request<T> {
    authed(inner, SELLER, Role::Seller)
}

pub fn buyer_req<T>(inner: T) -> Request<T> {
    authed(inner, BUYER, Role::Buyer)
}

/// A market with one seller, one buyer and the buyer's active company
/// accepting plastic and paper.
pub async fn setup_market() -> Arc<Market> {
    let db = MarketDatabase::open_in_memory().await.unwrap();
    db.create_user(SELLER, "sam@example.com", "Sam", Role::Seller, "h")
        .await
        .unwrap();
    db.create_user(BUYER, "bea@example.com", "Bea", Role::Buyer, "h")
        .await
        .unwrap();
    let market = Arc::new(Market::new(db, RewardPolicy::default(), 8));
    market
        .create_company(
            BUYER,
            &CompanyForm {
                company_name: COMPANY.into(),
                location: "Harbour Road 4".into(),
                contact_number: "555-0100".into(),
                waste_types_accepted: vec!["plastic".into(), "paper".into()],
                price_per_kg: 0.4,
                description: String::new(),
            },
        )
        .await
        .unwrap();
    market
}

pub fn booking_form(waste_type: &str) -> pb::BookingForm {
    pb::BookingForm {
        company_name: COMPANY.into(),
        waste_type: waste_type.into(),
        quantity_kg: 2.5,
        pickup_date: "2025-03-01".into(),
        time_slot: "09:00-11:00".into(),
    }
}
