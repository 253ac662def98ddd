//! Tests for `BookingService`.

use std::time::Duration;

use tokio_stream::StreamExt;
use tonic::Code;

use greenloop_proto::v1 as pb;
use greenloop_proto::v1::booking_service_server::BookingService;
use greenloop_proto::v1::{
    ClearMyBookingsRequest, CreateBookingRequest, ListMyBookingsRequest,
    ListPickupRequestsRequest, TransitionBookingRequest, WatchMyBookingsRequest,
    WatchPickupRequestsRequest,
};

use super::booking_svc::BookingServiceImpl;
use super::test_helpers::{SELLER, booking_form, buyer_req, seller_req, setup_market};

async fn setup() -> BookingServiceImpl {
    BookingServiceImpl::new(setup_market().await)
}

async fn book(svc: &BookingServiceImpl, waste_type: &str) -> pb::Booking {
    svc.create_booking(seller_req(CreateBookingRequest {
        form: Some(booking_form(waste_type)),
    }))
    .await
    .unwrap()
    .into_inner()
    .booking
    .unwrap()
}

fn act(booking_id: &str, action: pb::BookingAction) -> TransitionBookingRequest {
    TransitionBookingRequest {
        booking_id: booking_id.into(),
        action: action.into(),
    }
}

#[tokio::test]
async fn seller_books_pickup() {
    let svc = setup().await;
    let booking = book(&svc, "Plastic").await;

    assert_eq!(booking.seller_id, SELLER);
    assert_eq!(booking.waste_type, "plastic");
    assert_eq!(booking.status, i32::from(pb::BookingStatus::Pending));

    let mine = svc
        .list_my_bookings(seller_req(ListMyBookingsRequest {}))
        .await
        .unwrap()
        .into_inner()
        .bookings;
    assert_eq!(mine.len(), 1);

    let requests = svc
        .list_pickup_requests(buyer_req(ListPickupRequestsRequest {}))
        .await
        .unwrap()
        .into_inner()
        .bookings;
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].id, booking.id);
}

#[tokio::test]
async fn booking_rejects_bad_input() {
    let svc = setup().await;

    let err = svc
        .create_booking(seller_req(CreateBookingRequest { form: None }))
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::InvalidArgument);

    let err = svc
        .create_booking(seller_req(CreateBookingRequest {
            form: Some(booking_form("glass")),
        }))
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::InvalidArgument);

    let err = svc
        .create_booking(seller_req(CreateBookingRequest {
            form: Some(pb::BookingForm {
                company_name: "Nobody Ltd".into(),
                ..booking_form("plastic")
            }),
        }))
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::NotFound);

    let err = svc
        .create_booking(buyer_req(CreateBookingRequest {
            form: Some(booking_form("plastic")),
        }))
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::PermissionDenied);
}

#[tokio::test]
async fn buyer_confirms_then_completes() {
    let svc = setup().await;
    let booking = book(&svc, "paper").await;

    let confirmed = svc
        .transition_booking(buyer_req(act(&booking.id, pb::BookingAction::Confirm)))
        .await
        .unwrap()
        .into_inner();
    assert_eq!(
        confirmed.booking.unwrap().status,
        i32::from(pb::BookingStatus::Confirmed)
    );
    assert_eq!(confirmed.coins_awarded, 0);

    let completed = svc
        .transition_booking(buyer_req(act(&booking.id, pb::BookingAction::Complete)))
        .await
        .unwrap()
        .into_inner();
    assert_eq!(
        completed.booking.unwrap().status,
        i32::from(pb::BookingStatus::Completed)
    );
    assert_eq!(completed.coins_awarded, 1);

    let err = svc
        .transition_booking(buyer_req(act(&booking.id, pb::BookingAction::Complete)))
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::FailedPrecondition);
}

#[tokio::test]
async fn seller_cannot_cancel_confirmed_booking() {
    let svc = setup().await;
    let booking = book(&svc, "plastic").await;
    svc.transition_booking(buyer_req(act(&booking.id, pb::BookingAction::Confirm)))
        .await
        .unwrap();

    let err = svc
        .transition_booking(seller_req(act(&booking.id, pb::BookingAction::Cancel)))
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::FailedPrecondition);
}

#[tokio::test]
async fn unspecified_action_is_invalid() {
    let svc = setup().await;
    let booking = book(&svc, "plastic").await;

    let err = svc
        .transition_booking(seller_req(act(&booking.id, pb::BookingAction::Unspecified)))
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::InvalidArgument);

    let err = svc
        .transition_booking(seller_req(act("missing", pb::BookingAction::Cancel)))
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::NotFound);
}

#[tokio::test]
async fn clear_removes_only_own_bookings() {
    let svc = setup().await;
    book(&svc, "plastic").await;
    book(&svc, "paper").await;

    let removed = svc
        .clear_my_bookings(seller_req(ClearMyBookingsRequest {}))
        .await
        .unwrap()
        .into_inner()
        .removed;
    assert_eq!(removed, 2);

    let removed = svc
        .clear_my_bookings(buyer_req(ClearMyBookingsRequest {}))
        .await
        .unwrap()
        .into_inner()
        .removed;
    assert_eq!(removed, 0);
}

#[tokio::test]
async fn seller_feed_starts_with_snapshot_and_follows_changes() {
    let svc = setup().await;
    book(&svc, "plastic").await;

    let mut stream = svc
        .watch_my_bookings(seller_req(WatchMyBookingsRequest {}))
        .await
        .unwrap()
        .into_inner();

    let first = stream.next().await.unwrap().unwrap();
    assert_eq!(first.bookings.len(), 1);

    book(&svc, "paper").await;
    let second = tokio::time::timeout(Duration::from_secs(2), stream.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(second.bookings.len(), 2);
}

#[tokio::test]
async fn pickup_feed_sees_status_changes() {
    let svc = setup().await;
    let booking = book(&svc, "plastic").await;

    let mut stream = svc
        .watch_pickup_requests(buyer_req(WatchPickupRequestsRequest {}))
        .await
        .unwrap()
        .into_inner();
    let first = stream.next().await.unwrap().unwrap();
    assert_eq!(first.bookings[0].status, i32::from(pb::BookingStatus::Pending));

    svc.transition_booking(seller_req(act(&booking.id, pb::BookingAction::Cancel)))
        .await
        .unwrap();
    let next = tokio::time::timeout(Duration::from_secs(2), stream.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(
        next.bookings[0].status,
        i32::from(pb::BookingStatus::Cancelled)
    );
}
