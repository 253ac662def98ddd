//! Shared gRPC helpers: error mapping, model conversions and feed streams.

use std::pin::Pin;

use tokio::sync::mpsc;
use tokio_stream::Stream;
use tokio_stream::wrappers::ReceiverStream;
use tonic::Status;
use tracing::warn;

use greenloop_core::{BookingAction, BookingStatus, Voucher};
use greenloop_proto::prost_types::Timestamp;
use greenloop_proto::v1 as pb;

use crate::market::{MarketError, Subscription};
use crate::storage::{
    Booking, Company, PurchasedVoucher, Role, StatusCount, TransactionKind, User, Wallet,
    WalletTransaction, WasteTotal,
};

/// Buffered snapshots per streaming client before the forwarder waits.
const FEED_CHANNEL_SIZE: usize = 4;

pub type FeedStream<M> = Pin<Box<dyn Stream<Item = Result<M, Status>> + Send + 'static>>;

impl From<MarketError> for Status {
    fn from(e: MarketError) -> Self {
        match e {
            MarketError::InvalidTransition { .. }
            | MarketError::InsufficientCoins { .. }
            | MarketError::BelowMinimumExchange { .. } => Self::failed_precondition(e.to_string()),
            MarketError::NotAuthenticated => Self::unauthenticated(e.to_string()),
            MarketError::Forbidden(_) => Self::permission_denied(e.to_string()),
            MarketError::NotFound(_) => Self::not_found(e.to_string()),
            MarketError::InvalidArgument(_) => Self::invalid_argument(e.to_string()),
            MarketError::RemoteWrite(ref inner) => {
                warn!(error = %inner, "Store failure");
                Self::internal(e.to_string())
            }
        }
    }
}

/// Forward a feed subscription to a gRPC server stream.
///
/// The forwarding task ends when the client goes away or the feed closes.
pub fn feed_stream<T, M, F>(mut sub: Subscription<T>, convert: F) -> FeedStream<M>
where
    T: Clone + Send + 'static,
    M: Send + 'static,
    F: Fn(T) -> M + Send + 'static,
{
    let (tx, rx) = mpsc::channel::<Result<M, Status>>(FEED_CHANNEL_SIZE);
    tokio::spawn(async move {
        loop {
            tokio::select! {
                () = tx.closed() => break,
                next = sub.next() => match next {
                    Some(snapshot) => {
                        if tx.send(Ok(convert(snapshot))).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                },
            }
        }
    });
    Box::pin(ReceiverStream::new(rx))
}

pub const fn timestamp(unix_secs: i64) -> Timestamp {
    Timestamp {
        seconds: unix_secs,
        nanos: 0,
    }
}

pub fn role_to_proto(role: Role) -> pb::Role {
    match role {
        Role::Seller => pb::Role::Seller,
        Role::Buyer => pb::Role::Buyer,
    }
}

#[allow(clippy::result_large_err)]
pub fn role_from_proto(value: i32) -> Result<Role, Status> {
    match pb::Role::try_from(value) {
        Ok(pb::Role::Seller) => Ok(Role::Seller),
        Ok(pb::Role::Buyer) => Ok(Role::Buyer),
        _ => Err(Status::invalid_argument("Role must be seller or buyer")),
    }
}

#[allow(clippy::result_large_err)]
pub fn action_from_proto(value: i32) -> Result<BookingAction, Status> {
    match pb::BookingAction::try_from(value) {
        Ok(pb::BookingAction::Confirm) => Ok(BookingAction::Confirm),
        Ok(pb::BookingAction::Cancel) => Ok(BookingAction::Cancel),
        Ok(pb::BookingAction::Complete) => Ok(BookingAction::Complete),
        _ => Err(Status::invalid_argument("Unknown booking action")),
    }
}

fn status_to_proto(status: &str) -> pb::BookingStatus {
    match status.parse::<BookingStatus>() {
        Ok(BookingStatus::Pending) => pb::BookingStatus::Pending,
        Ok(BookingStatus::Confirmed) => pb::BookingStatus::Confirmed,
        Ok(BookingStatus::Completed) => pb::BookingStatus::Completed,
        Ok(BookingStatus::Cancelled) => pb::BookingStatus::Cancelled,
        Err(_) => pb::BookingStatus::Unspecified,
    }
}

pub fn user_to_profile(user: User) -> pb::Profile {
    let role = user.role().map_or(pb::Role::Unspecified, role_to_proto);
    pb::Profile {
        user_id: user.id,
        email: user.email,
        display_name: user.display_name,
        role: role.into(),
        profile_image_url: user.profile_image_url.unwrap_or_default(),
        created_at: Some(timestamp(user.created_at)),
    }
}

pub fn company_to_proto(company: Company) -> pb::Company {
    let waste_types = company.waste_types().unwrap_or_default();
    pb::Company {
        id: company.id,
        company_name: company.company_name,
        location: company.location,
        contact_number: company.contact_number,
        waste_types_accepted: waste_types,
        price_per_kg: company.price_per_kg,
        description: company.description,
        buyer_id: company.buyer_id,
        is_active: company.is_active,
        created_at: Some(timestamp(company.created_at)),
        updated_at: Some(timestamp(company.updated_at)),
    }
}

pub fn booking_to_proto(booking: Booking) -> pb::Booking {
    pb::Booking {
        status: status_to_proto(&booking.status).into(),
        id: booking.id,
        seller_id: booking.seller_id,
        company_name: booking.company_name,
        waste_type: booking.waste_type,
        quantity_kg: booking.quantity_kg,
        pickup_date: booking.pickup_date,
        time_slot: booking.time_slot,
        created_at: Some(timestamp(booking.created_at)),
        updated_at: Some(timestamp(booking.updated_at)),
    }
}

pub fn bookings_snapshot(bookings: Vec<Booking>) -> pb::BookingSnapshot {
    pb::BookingSnapshot {
        bookings: bookings.into_iter().map(booking_to_proto).collect(),
    }
}

pub fn wallet_to_proto(wallet: Wallet) -> pb::Wallet {
    pb::Wallet {
        user_id: wallet.user_id,
        coin_balance: wallet.coin_balance,
        cash_balance: wallet.cash_balance,
    }
}

pub fn transaction_to_proto(entry: WalletTransaction) -> pb::WalletTransaction {
    let kind = match entry.kind() {
        Ok(TransactionKind::Award) => pb::TransactionKind::Award,
        Ok(TransactionKind::VoucherPurchase) => pb::TransactionKind::VoucherPurchase,
        Ok(TransactionKind::Exchange) => pb::TransactionKind::Exchange,
        Err(_) => pb::TransactionKind::Unspecified,
    };
    pb::WalletTransaction {
        id: entry.id,
        kind: kind.into(),
        coins_delta: entry.coins_delta,
        cash_delta: entry.cash_delta,
        related_booking_id: entry.related_booking_id.unwrap_or_default(),
        waste_type: entry.waste_type.unwrap_or_default(),
        voucher_title: entry.voucher_title.unwrap_or_default(),
        created_at: Some(timestamp(entry.created_at)),
    }
}

pub fn voucher_to_proto(voucher: &Voucher) -> pb::Voucher {
    pb::Voucher {
        title: voucher.title.to_string(),
        description: voucher.description.to_string(),
        coin_cost: voucher.coin_cost,
        brand: voucher.brand.to_string(),
    }
}

pub fn purchased_to_proto(purchased: PurchasedVoucher) -> pb::PurchasedVoucher {
    pb::PurchasedVoucher {
        voucher: Some(pb::Voucher {
            title: purchased.title,
            description: purchased.description,
            coin_cost: purchased.coin_cost,
            brand: purchased.brand,
        }),
        purchased_at: Some(timestamp(purchased.purchased_at)),
    }
}

pub fn status_counts_to_proto(counts: Vec<StatusCount>) -> Vec<pb::StatusCount> {
    counts
        .into_iter()
        .map(|c| pb::StatusCount {
            status: status_to_proto(&c.status).into(),
            count: c.count,
        })
        .collect()
}

pub fn waste_totals_to_proto(totals: Vec<WasteTotal>) -> Vec<pb::WasteTotal> {
    totals
        .into_iter()
        .map(|t| pb::WasteTotal {
            waste_type: t.waste_type,
            quantity_kg: t.quantity_kg,
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tonic::Code;

    use super::*;
    use greenloop_core::db::DatabaseError;

    #[test]
    fn market_errors_map_to_grpc_codes() {
        let cases = [
            (
                MarketError::InvalidTransition {
                    booking_id: "b".into(),
                    reason: "booking is already completed".into(),
                },
                Code::FailedPrecondition,
            ),
            (
                MarketError::InsufficientCoins {
                    required: 3,
                    available: 2,
                },
                Code::FailedPrecondition,
            ),
            (
                MarketError::BelowMinimumExchange {
                    requested: 3,
                    minimum: 5,
                },
                Code::FailedPrecondition,
            ),
            (MarketError::NotAuthenticated, Code::Unauthenticated),
            (MarketError::Forbidden("x".into()), Code::PermissionDenied),
            (MarketError::NotFound("x".into()), Code::NotFound),
            (MarketError::InvalidArgument("x".into()), Code::InvalidArgument),
            (
                MarketError::RemoteWrite(DatabaseError::Query("disk full".into())),
                Code::Internal,
            ),
        ];
        for (err, code) in cases {
            assert_eq!(Status::from(err).code(), code);
        }
    }

    #[test]
    fn store_failure_message_is_kept() {
        let status = Status::from(MarketError::RemoteWrite(DatabaseError::Query(
            "database is locked".into(),
        )));
        assert!(status.message().contains("database is locked"));
    }

    #[test]
    fn unspecified_enums_are_rejected() {
        assert_eq!(
            role_from_proto(pb::Role::Unspecified as i32).unwrap_err().code(),
            Code::InvalidArgument
        );
        assert_eq!(role_from_proto(pb::Role::Buyer as i32).unwrap(), Role::Buyer);
        assert!(action_from_proto(0).is_err());
        assert!(action_from_proto(99).is_err());
        assert_eq!(
            action_from_proto(pb::BookingAction::Complete as i32).unwrap(),
            BookingAction::Complete
        );
    }

    #[test]
    fn unknown_status_maps_to_unspecified() {
        assert_eq!(status_to_proto("completed"), pb::BookingStatus::Completed);
        assert_eq!(status_to_proto("done"), pb::BookingStatus::Unspecified);
        assert_eq!(status_to_proto("bogus"), pb::BookingStatus::Unspecified);
    }
}
