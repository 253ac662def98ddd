//! Tests for `WalletService`.

use std::sync::Arc;
use std::time::Duration;

use tokio_stream::StreamExt;
use tonic::Code;

use greenloop_core::BookingAction;
use greenloop_proto::v1 as pb;
use greenloop_proto::v1::wallet_service_server::WalletService;
use greenloop_proto::v1::{
    ExchangeRequest, GetBuyerStatsRequest, GetSellerStatsRequest, GetWalletRequest,
    ListPurchasedVouchersRequest, ListTransactionsRequest, ListVoucherCatalogRequest,
    PurchaseVoucherRequest, WatchWalletRequest,
};

use super::test_helpers::{COMPANY, SELLER, buyer_req, seller_req, setup_market};
use super::wallet_svc::WalletServiceImpl;
use crate::market::{BookingForm, Market};

async fn setup() -> (WalletServiceImpl, Arc<Market>) {
    let market = setup_market().await;
    (WalletServiceImpl::new(Arc::clone(&market)), market)
}

/// Create and complete `n` bookings for the seller, earning one coin each.
async fn earn(market: &Market, n: usize) {
    for _ in 0..n {
        let booking = market
            .create_booking(
                SELLER,
                &BookingForm {
                    company_name: COMPANY.into(),
                    waste_type: "plastic".into(),
                    quantity_kg: 1.5,
                    pickup_date: "2025-03-01".into(),
                    time_slot: "09:00-11:00".into(),
                },
            )
            .await
            .unwrap();
        market
            .transition_booking(SELLER, &booking.id, BookingAction::Complete)
            .await
            .unwrap();
    }
}

async fn wallet(svc: &WalletServiceImpl) -> pb::Wallet {
    svc.get_wallet(seller_req(GetWalletRequest {}))
        .await
        .unwrap()
        .into_inner()
}

#[tokio::test]
async fn new_user_has_empty_wallet() {
    let (svc, _market) = setup().await;
    let w = wallet(&svc).await;
    assert_eq!(w.user_id, SELLER);
    assert_eq!(w.coin_balance, 0);
    assert_eq!(w.cash_balance, 0);
}

#[tokio::test]
async fn catalog_lists_every_voucher() {
    let (svc, _market) = setup().await;
    let vouchers = svc
        .list_voucher_catalog(buyer_req(ListVoucherCatalogRequest {}))
        .await
        .unwrap()
        .into_inner()
        .vouchers;
    assert_eq!(vouchers.len(), greenloop_core::rewards::catalog().len());
    assert!(vouchers.iter().any(|v| v.title == "Reusable Tote Bag"));
}

#[tokio::test]
async fn purchase_debits_and_records_voucher() {
    let (svc, market) = setup().await;
    earn(&market, 4).await;

    let resp = svc
        .purchase_voucher(seller_req(PurchaseVoucherRequest {
            title: "Reusable Tote Bag".into(),
        }))
        .await
        .unwrap()
        .into_inner();
    assert_eq!(resp.wallet.unwrap().coin_balance, 1);
    assert_eq!(resp.voucher.unwrap().voucher.unwrap().coin_cost, 3);

    let err = svc
        .purchase_voucher(seller_req(PurchaseVoucherRequest {
            title: "Reusable Tote Bag".into(),
        }))
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::FailedPrecondition);
    assert_eq!(wallet(&svc).await.coin_balance, 1);

    let owned = svc
        .list_purchased_vouchers(seller_req(ListPurchasedVouchersRequest {}))
        .await
        .unwrap()
        .into_inner()
        .vouchers;
    assert_eq!(owned.len(), 1);

    let err = svc
        .purchase_voucher(seller_req(PurchaseVoucherRequest {
            title: "Golden Ticket".into(),
        }))
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::NotFound);
}

#[tokio::test]
async fn exchange_floors_cash() {
    let (svc, market) = setup().await;
    earn(&market, 12).await;

    let resp = svc
        .exchange(seller_req(ExchangeRequest { coins: 7 }))
        .await
        .unwrap()
        .into_inner();
    assert_eq!(resp.cash_credited, 1);
    let w = resp.wallet.unwrap();
    assert_eq!(w.coin_balance, 5);
    assert_eq!(w.cash_balance, 1);

    let err = svc
        .exchange(seller_req(ExchangeRequest { coins: 3 }))
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::FailedPrecondition);

    let err = svc
        .exchange(seller_req(ExchangeRequest { coins: 10 }))
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::FailedPrecondition);
}

#[tokio::test]
async fn transaction_log_is_newest_first() {
    let (svc, market) = setup().await;
    earn(&market, 5).await;
    svc.exchange(seller_req(ExchangeRequest { coins: 5 }))
        .await
        .unwrap();

    let log = svc
        .list_transactions(seller_req(ListTransactionsRequest {}))
        .await
        .unwrap()
        .into_inner()
        .transactions;
    assert_eq!(log.len(), 6);
    assert_eq!(log[0].kind, i32::from(pb::TransactionKind::Exchange));
    assert_eq!(log[0].coins_delta, -5);
    assert_eq!(log[0].cash_delta, 1);
    assert!(
        log[1..]
            .iter()
            .all(|t| t.kind == i32::from(pb::TransactionKind::Award) && t.waste_type == "plastic")
    );
}

#[tokio::test]
async fn wallet_feed_follows_awards() {
    let (svc, market) = setup().await;

    let mut stream = svc
        .watch_wallet(seller_req(WatchWalletRequest {}))
        .await
        .unwrap()
        .into_inner();
    let first = stream.next().await.unwrap().unwrap();
    assert_eq!(first.coin_balance, 0);

    earn(&market, 1).await;
    let next = tokio::time::timeout(Duration::from_secs(2), stream.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(next.coin_balance, 1);
}

#[tokio::test]
async fn stats_summarize_completed_work() {
    let (svc, market) = setup().await;
    earn(&market, 2).await;

    let seller = svc
        .get_seller_stats(seller_req(GetSellerStatsRequest {}))
        .await
        .unwrap()
        .into_inner();
    assert_eq!(seller.coins_earned, 2);
    let completed = seller
        .by_status
        .iter()
        .find(|c| c.status == i32::from(pb::BookingStatus::Completed))
        .unwrap();
    assert_eq!(completed.count, 2);
    assert_eq!(seller.completed_by_waste_type.len(), 1);
    assert!((seller.completed_by_waste_type[0].quantity_kg - 3.0).abs() < 1e-9);

    let buyer = svc
        .get_buyer_stats(buyer_req(GetBuyerStatsRequest {}))
        .await
        .unwrap()
        .into_inner();
    assert_eq!(buyer.completed_by_waste_type[0].waste_type, "plastic");
}
