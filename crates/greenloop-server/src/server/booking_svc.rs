//! `BookingService` gRPC implementation.

use std::sync::Arc;

use tonic::{Request, Response, Status};
use tracing::{info, instrument};

use greenloop_proto::v1::booking_service_server::BookingService;
use greenloop_proto::v1::{
    BookingResponse, BookingSnapshot, ClearMyBookingsRequest, ClearMyBookingsResponse,
    CreateBookingRequest, ListBookingsResponse, ListMyBookingsRequest, ListPickupRequestsRequest,
    TransitionBookingRequest, TransitionBookingResponse, WatchMyBookingsRequest,
    WatchPickupRequestsRequest,
};

use super::grpc_util::{
    FeedStream, action_from_proto, booking_to_proto, bookings_snapshot, feed_stream,
};
use super::interceptor::caller_id;
use crate::market::{BookingForm, Market};

pub struct BookingServiceImpl {
    market: Arc<Market>,
}

impl BookingServiceImpl {
    pub const fn new(market: Arc<Market>) -> Self {
        Self { market }
    }
}

#[tonic::async_trait]
impl BookingService for BookingServiceImpl {
    type WatchMyBookingsStream = FeedStream<BookingSnapshot>;
    type WatchPickupRequestsStream = FeedStream<BookingSnapshot>;

    #[instrument(skip(self, request), fields(rpc = "CreateBooking"))]
    async fn create_booking(
        &self,
        request: Request<CreateBookingRequest>,
    ) -> Result<Response<BookingResponse>, Status> {
        let user_id = caller_id(&request)?;
        let form = request
            .into_inner()
            .form
            .ok_or_else(|| Status::invalid_argument("Booking form is required"))?;

        let booking = self
            .market
            .create_booking(
                &user_id,
                &BookingForm {
                    company_name: form.company_name,
                    waste_type: form.waste_type,
                    quantity_kg: form.quantity_kg,
                    pickup_date: form.pickup_date,
                    time_slot: form.time_slot,
                },
            )
            .await?;

        Ok(Response::new(BookingResponse {
            booking: Some(booking_to_proto(booking)),
        }))
    }

    #[instrument(skip(self, request), fields(rpc = "ListMyBookings"))]
    async fn list_my_bookings(
        &self,
        request: Request<ListMyBookingsRequest>,
    ) -> Result<Response<ListBookingsResponse>, Status> {
        let user_id = caller_id(&request)?;
        let bookings = self.market.list_bookings_for_seller(&user_id).await?;
        Ok(Response::new(ListBookingsResponse {
            bookings: bookings.into_iter().map(booking_to_proto).collect(),
        }))
    }

    #[instrument(skip(self, request), fields(rpc = "ListPickupRequests"))]
    async fn list_pickup_requests(
        &self,
        request: Request<ListPickupRequestsRequest>,
    ) -> Result<Response<ListBookingsResponse>, Status> {
        let user_id = caller_id(&request)?;
        let bookings = self.market.list_pickup_requests(&user_id).await?;
        Ok(Response::new(ListBookingsResponse {
            bookings: bookings.into_iter().map(booking_to_proto).collect(),
        }))
    }

    #[instrument(skip(self, request), fields(rpc = "TransitionBooking"))]
    async fn transition_booking(
        &self,
        request: Request<TransitionBookingRequest>,
    ) -> Result<Response<TransitionBookingResponse>, Status> {
        let user_id = caller_id(&request)?;
        let req = request.into_inner();
        let action = action_from_proto(req.action)?;

        let outcome = self
            .market
            .transition_booking(&user_id, &req.booking_id, action)
            .await?;

        Ok(Response::new(TransitionBookingResponse {
            booking: Some(booking_to_proto(outcome.booking)),
            coins_awarded: outcome.coins_awarded,
        }))
    }

    #[instrument(skip(self, request), fields(rpc = "ClearMyBookings"))]
    async fn clear_my_bookings(
        &self,
        request: Request<ClearMyBookingsRequest>,
    ) -> Result<Response<ClearMyBookingsResponse>, Status> {
        let user_id = caller_id(&request)?;
        let removed = self.market.clear_bookings(&user_id).await?;
        Ok(Response::new(ClearMyBookingsResponse { removed }))
    }

    #[instrument(skip(self, request), fields(rpc = "WatchMyBookings"))]
    async fn watch_my_bookings(
        &self,
        request: Request<WatchMyBookingsRequest>,
    ) -> Result<Response<Self::WatchMyBookingsStream>, Status> {
        let user_id = caller_id(&request)?;
        let sub = self.market.watch_seller_bookings(&user_id).await?;
        info!(user_id = %user_id, "Seller bookings feed opened");
        Ok(Response::new(feed_stream(sub, bookings_snapshot)))
    }

    #[instrument(skip(self, request), fields(rpc = "WatchPickupRequests"))]
    async fn watch_pickup_requests(
        &self,
        request: Request<WatchPickupRequestsRequest>,
    ) -> Result<Response<Self::WatchPickupRequestsStream>, Status> {
        let user_id = caller_id(&request)?;
        let sub = self.market.watch_pickup_requests(&user_id).await?;
        info!(user_id = %user_id, "Pickup requests feed opened");
        Ok(Response::new(feed_stream(sub, bookings_snapshot)))
    }
}
