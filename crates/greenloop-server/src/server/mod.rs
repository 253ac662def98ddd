//! gRPC server implementations for the GreenLoop marketplace.

pub mod auth_svc;
pub mod booking_svc;
pub mod company_svc;
pub mod grpc_util;
pub mod interceptor;
pub mod profile_svc;
pub mod wallet_svc;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod booking_svc_tests;
#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod test_helpers;
#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod wallet_svc_tests;

pub use auth_svc::AuthServiceImpl;
pub use booking_svc::BookingServiceImpl;
pub use company_svc::CompanyServiceImpl;
pub use interceptor::jwt_interceptor;
pub use profile_svc::ProfileServiceImpl;
pub use wallet_svc::WalletServiceImpl;
