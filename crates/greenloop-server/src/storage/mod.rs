//! `SQLite` storage for the `GreenLoop` marketplace.
//!
//! Provides persistence for users, tokens, companies, bookings and the
//! reward ledger.

mod db;
mod models;
mod queries;
mod queries_bookings;
mod queries_companies;
mod queries_stats;
mod queries_wallet;


pub use db::MarketDatabase;
pub use greenloop_core::db::DatabaseError;
pub use models::*;
pub use queries_bookings::{AwardParams, BookingParams, TransitionOutcome, TransitionParams};
pub use queries_companies::CompanyParams;
pub use queries_stats::{StatusCount, WasteTotal};
pub use queries_wallet::LedgerError;
