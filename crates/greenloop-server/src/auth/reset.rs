//! Password reset tokens and their delivery.

use std::fmt::Write as _;

use argon2::password_hash::rand_core::{OsRng, RngCore};
use tracing::{debug, info};

/// Hands a reset token to the user out of band.
pub trait ResetMailer: Send + Sync {
    fn send_reset(&self, email: &str, token: &str);
}

/// Writes reset tokens to the log instead of sending mail.
///
/// The token itself is only emitted at `debug` level.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogMailer;

impl ResetMailer for LogMailer {
    fn send_reset(&self, email: &str, token: &str) {
        info!(email, "Password reset requested");
        debug!(email, token, "Password reset token");
    }
}

/// Generate a random reset token (32 bytes, hex encoded).
pub fn generate_reset_token() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    bytes.iter().fold(String::with_capacity(64), |mut out, b| {
        let _ = write!(out, "{b:02x}");
        out
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_tokens_are_random_hex() {
        let a = generate_reset_token();
        let b = generate_reset_token();
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }
}
