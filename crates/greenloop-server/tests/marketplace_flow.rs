#![allow(clippy::unwrap_used)] // Integration tests use unwrap for brevity

//! End-to-end marketplace flow through the gRPC service layer.
//!
//! Accounts are registered through `AuthService`; every other call carries
//! the issued access token through the JWT interceptor, as it would over
//! the wire.

use std::sync::Arc;

use tonic::metadata::MetadataValue;
use tonic::{Code, Request};

use greenloop_core::RewardPolicy;
use greenloop_core::config::AuthConfig;
use greenloop_proto::v1 as pb;
use greenloop_proto::v1::auth_service_server::AuthService;
use greenloop_proto::v1::booking_service_server::BookingService;
use greenloop_proto::v1::company_service_server::CompanyService;
use greenloop_proto::v1::wallet_service_server::WalletService;

use greenloop_server::auth::{JwtManager, LogMailer};
use greenloop_server::market::Market;
use greenloop_server::server::{
    AuthServiceImpl, BookingServiceImpl, CompanyServiceImpl, WalletServiceImpl, jwt_interceptor,
};
use greenloop_server::storage::MarketDatabase;

struct App {
    jwt: Arc<JwtManager>,
    market: Arc<Market>,
    auth: AuthServiceImpl,
    companies: CompanyServiceImpl,
    bookings: BookingServiceImpl,
    wallet: WalletServiceImpl,
}

impl App {
    fn new(db: MarketDatabase) -> Self {
        let jwt = Arc::new(JwtManager::new(b"integration-secret", 3600, 86400));
        let market = Arc::new(Market::new(db.clone(), RewardPolicy::default(), 16));
        Self {
            auth: AuthServiceImpl::new(
                db,
                Arc::clone(&jwt),
                Arc::new(LogMailer),
                AuthConfig::default(),
            ),
            companies: CompanyServiceImpl::new(Arc::clone(&market)),
            bookings: BookingServiceImpl::new(Arc::clone(&market)),
            wallet: WalletServiceImpl::new(Arc::clone(&market)),
            jwt,
            market,
        }
    }

    async fn register(&self, email: &str, role: pb::Role) -> String {
        self.auth
            .register(Request::new(pb::RegisterRequest {
                email: email.into(),
                password: "correct-horse".into(),
                display_name: email.split('@').next().unwrap().into(),
                role: role.into(),
            }))
            .await
            .unwrap()
            .into_inner()
            .access_token
    }

    /// Run `inner` through the interceptor with `token` as bearer.
    fn call<T>(&self, token: &str, inner: T) -> Result<Request<T>, tonic::Status> {
        let mut probe = Request::new(());
        probe.metadata_mut().insert(
            "authorization",
            MetadataValue::try_from(format!("Bearer {token}")).unwrap(),
        );
        let checked = jwt_interceptor(Arc::clone(&self.jwt))(probe)?;
        let (metadata, extensions, ()) = checked.into_parts();
        Ok(Request::from_parts(metadata, extensions, inner))
    }
}

fn recycler_form() -> pb::CompanyForm {
    pb::CompanyForm {
        company_name: "Green Cycle".into(),
        location: "Mill Lane 2".into(),
        contact_number: "555-0142".into(),
        waste_types_accepted: vec!["plastic".into(), "metal".into()],
        price_per_kg: 0.5,
        description: "Same-week pickups".into(),
    }
}

fn pickup(waste_type: &str, kg: f64) -> pb::CreateBookingRequest {
    pb::CreateBookingRequest {
        form: Some(pb::BookingForm {
            company_name: "Green Cycle".into(),
            waste_type: waste_type.into(),
            quantity_kg: kg,
            pickup_date: "2025-04-12".into(),
            time_slot: "14:00-16:00".into(),
        }),
    }
}

fn act(booking_id: &str, action: pb::BookingAction) -> pb::TransitionBookingRequest {
    pb::TransitionBookingRequest {
        booking_id: booking_id.into(),
        action: action.into(),
    }
}

#[tokio::test]
async fn seller_earns_and_spends_coins() {
    let app = App::new(MarketDatabase::open_in_memory().await.unwrap());
    let seller = app.register("sam@example.com", pb::Role::Seller).await;
    let buyer = app.register("bea@example.com", pb::Role::Buyer).await;

    app.companies
        .create_company(
            app.call(
                &buyer,
                pb::CreateCompanyRequest {
                    form: Some(recycler_form()),
                },
            )
            .unwrap(),
        )
        .await
        .unwrap();

    // Six pickups: the buyer confirms and completes each one.
    for kg in [1.0, 2.0, 3.0, 4.0, 5.0, 6.0] {
        let booking = app
            .bookings
            .create_booking(app.call(&seller, pickup("plastic", kg)).unwrap())
            .await
            .unwrap()
            .into_inner()
            .booking
            .unwrap();
        app.bookings
            .transition_booking(
                app.call(&buyer, act(&booking.id, pb::BookingAction::Confirm))
                    .unwrap(),
            )
            .await
            .unwrap();
        let done = app
            .bookings
            .transition_booking(
                app.call(&buyer, act(&booking.id, pb::BookingAction::Complete))
                    .unwrap(),
            )
            .await
            .unwrap()
            .into_inner();
        assert_eq!(done.coins_awarded, 1);
    }

    let wallet = app
        .wallet
        .get_wallet(app.call(&seller, pb::GetWalletRequest {}).unwrap())
        .await
        .unwrap()
        .into_inner();
    assert_eq!(wallet.coin_balance, 6);

    let bought = app
        .wallet
        .purchase_voucher(
            app.call(
                &seller,
                pb::PurchaseVoucherRequest {
                    title: "10% Grocery Discount".into(),
                },
            )
            .unwrap(),
        )
        .await
        .unwrap()
        .into_inner();
    assert_eq!(bought.wallet.unwrap().coin_balance, 1);

    let err = app
        .wallet
        .exchange(app.call(&seller, pb::ExchangeRequest { coins: 5 }).unwrap())
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::FailedPrecondition);

    let stats = app
        .wallet
        .get_buyer_stats(app.call(&buyer, pb::GetBuyerStatsRequest {}).unwrap())
        .await
        .unwrap()
        .into_inner();
    assert_eq!(stats.completed_by_waste_type.len(), 1);
    assert!((stats.completed_by_waste_type[0].quantity_kg - 21.0).abs() < 1e-9);

    let seller_id = app.jwt.validate(&seller).unwrap().sub;
    assert!(app.market.verify_ledger(&seller_id).await.unwrap());
}

#[tokio::test]
async fn bad_or_missing_token_is_turned_away() {
    let app = App::new(MarketDatabase::open_in_memory().await.unwrap());

    let err = app.call("not-a-jwt", pb::GetWalletRequest {}).unwrap_err();
    assert_eq!(err.code(), Code::Unauthenticated);

    let other = JwtManager::new(b"someone-else", 3600, 86400);
    let access = app.register("sam@example.com", pb::Role::Seller).await;
    let seller_id = app.jwt.validate(&access).unwrap().sub;
    let (forged, _) = other
        .issue_access_token(&seller_id, greenloop_server::storage::Role::Seller)
        .unwrap();
    let err = app.call(&forged, pb::GetWalletRequest {}).unwrap_err();
    assert_eq!(err.code(), Code::Unauthenticated);
}

#[tokio::test]
async fn buyer_cannot_complete_pending_booking_but_seller_can() {
    let app = App::new(MarketDatabase::open_in_memory().await.unwrap());
    let seller = app.register("sam@example.com", pb::Role::Seller).await;
    let buyer = app.register("bea@example.com", pb::Role::Buyer).await;
    app.companies
        .create_company(
            app.call(
                &buyer,
                pb::CreateCompanyRequest {
                    form: Some(recycler_form()),
                },
            )
            .unwrap(),
        )
        .await
        .unwrap();

    let booking = app
        .bookings
        .create_booking(app.call(&seller, pickup("metal", 3.5)).unwrap())
        .await
        .unwrap()
        .into_inner()
        .booking
        .unwrap();

    let err = app
        .bookings
        .transition_booking(
            app.call(&buyer, act(&booking.id, pb::BookingAction::Complete))
                .unwrap(),
        )
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::FailedPrecondition);

    let done = app
        .bookings
        .transition_booking(
            app.call(&seller, act(&booking.id, pb::BookingAction::Complete))
                .unwrap(),
        )
        .await
        .unwrap()
        .into_inner();
    assert_eq!(done.coins_awarded, 1);
}

#[tokio::test]
async fn ledger_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("market.db");

    let seller_id = {
        let app = App::new(MarketDatabase::open(&path).await.unwrap());
        let seller = app.register("sam@example.com", pb::Role::Seller).await;
        let buyer = app.register("bea@example.com", pb::Role::Buyer).await;
        app.companies
            .create_company(
                app.call(
                    &buyer,
                    pb::CreateCompanyRequest {
                        form: Some(recycler_form()),
                    },
                )
                .unwrap(),
            )
            .await
            .unwrap();
        let booking = app
            .bookings
            .create_booking(app.call(&seller, pickup("plastic", 2.0)).unwrap())
            .await
            .unwrap()
            .into_inner()
            .booking
            .unwrap();
        app.bookings
            .transition_booking(
                app.call(&seller, act(&booking.id, pb::BookingAction::Complete))
                    .unwrap(),
            )
            .await
            .unwrap();
        app.market.db().pool().close().await;
        app.jwt.validate(&seller).unwrap().sub
    };

    let db = MarketDatabase::open(&path).await.unwrap();
    let wallet = db.get_wallet(&seller_id).await.unwrap();
    assert_eq!(wallet.coin_balance, 1);
    let log = db.list_transactions(&seller_id).await.unwrap();
    assert_eq!(log.len(), 1);
    assert!(db.verify_ledger(&seller_id).await.unwrap());
}
