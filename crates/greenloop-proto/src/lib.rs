//! GreenLoop Protocol Buffers
//!
//! Generated protobuf code for the GreenLoop gRPC API:
//! - `AuthService` for accounts, tokens and password reset
//! - `ProfileService` for the signed-in user's profile
//! - `CompanyService` for buyer company listings
//! - `BookingService` for pickup bookings and live booking feeds
//! - `WalletService` for green coins, vouchers and statistics

#![allow(clippy::derive_partial_eq_without_eq)]

/// GreenLoop v1 API definitions.
pub mod v1 {
    tonic::include_proto!("greenloop.v1");
}

pub use v1::*;

pub use prost_types;
