//! Authentication for the marketplace.
//!
//! Provides JWT token management, password hashing and password reset
//! tokens.

pub mod claims;
pub mod jwt;
pub mod password;
pub mod reset;

pub use claims::Claims;
pub use jwt::JwtManager;
pub use reset::{LogMailer, ResetMailer};
