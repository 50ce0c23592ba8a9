//! One-time code generation and verification.
//!
//! Only the HMAC of `email:code` is ever stored; the plaintext code exists
//! solely in the outgoing email.

use rand::RngExt;

use crate::crypto::{hmac_sha256_hex, normalize_email, safe_equal_hex};

/// Generate a 6-digit code, uniform over [100000, 999999].
///
/// `random_range` draws without modulo bias from the thread-local CSPRNG.
pub fn generate_code() -> String {
    let mut rng = rand::rng();
    rng.random_range(100_000..=999_999).to_string()
}

/// HMAC of `"<normalized email>:<code>"` keyed by the server OTP secret.
pub fn hash_otp(email: &str, code: &str, secret: &str) -> String {
    let email = normalize_email(email);
    hmac_sha256_hex(&format!("{email}:{code}"), secret)
}

/// Recompute the hash and compare timing-safe. Total: malformed input is a
/// non-match, never a panic.
pub fn verify_otp_hash(email: &str, code: &str, secret: &str, expected_hex: &str) -> bool {
    safe_equal_hex(&hash_otp(email, code, secret), expected_hex)
}
