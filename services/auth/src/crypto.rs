//! Constant-time hashing and comparison primitives.
//!
//! Everything stored or compared during authentication goes through here:
//! one-time codes are HMAC-hashed, IPs and user agents are salted-hashed for
//! the audit trail, and digest comparison is timing safe.

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// HMAC-SHA256 over `value`, hex encoded.
pub fn hmac_sha256_hex(value: &str, secret: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(value.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Salted SHA-256 over `"<salt>:<value>"`, hex encoded. Used to pseudonymize
/// IPs and user agents before they reach the audit trail.
pub fn hash_identifier(value: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(b":");
    hasher.update(value.as_bytes());
    hex::encode(hasher.finalize())
}

/// Timing-safe equality over two hex digests.
///
/// Non-hex input or a length mismatch fails closed. The digest comparison
/// itself is constant time via `subtle`.
pub fn safe_equal_hex(left: &str, right: &str) -> bool {
    let (Ok(left), Ok(right)) = (hex::decode(left), hex::decode(right)) else {
        return false;
    };
    if left.len() != right.len() {
        return false;
    }
    left.as_slice().ct_eq(right.as_slice()).into()
}
