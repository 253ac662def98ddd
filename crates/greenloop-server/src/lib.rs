//! GreenLoop Marketplace Server Library
//!
//! Core functionality for the waste marketplace backend:
//! - SQLite storage for accounts, companies, bookings and the coin ledger
//! - JWT authentication, password hashing and reset tokens
//! - Marketplace operations with live snapshot feeds
//! - gRPC services (Auth, Profile, Company, Booking, Wallet)

pub mod auth;
pub mod market;
pub mod server;
pub mod storage;
