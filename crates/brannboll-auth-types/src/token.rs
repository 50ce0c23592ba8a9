//! Session JWT validation.
//!
//! Signature + `exp` validity is only half of session verification; the
//! caller must still check the session row for revocation. This module owns
//! the cheap, stateless half.

use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::Deserialize;
#[cfg(any(feature = "USE_ONLY_IN_AUTH_SERVICE", test))]
use serde::Serialize;
use uuid::Uuid;

use crate::role::UserRole;

/// Identity extracted from a validated session token.
#[derive(Debug, Clone)]
pub struct SessionTokenInfo {
    pub user_id: Uuid,
    pub role: UserRole,
    pub email: String,
    pub session_id: Uuid,
    pub expires_at: u64,
}

/// Errors returned by [`validate_session_token`].
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("invalid signature")]
    InvalidSignature,
    #[error("token expired")]
    Expired,
    #[error("malformed token")]
    Malformed,
}

/// JWT claims payload.
///
/// `sub` is the user ID, `sid` the server-side session row ID. `exp` equals
/// the session row's `expires_at`, so the token never outlives the row.
///
/// [`Deserialize`] is always available since every consumer validates tokens.
/// [`Serialize`] requires the **`USE_ONLY_IN_AUTH_SERVICE`** cargo feature;
/// only the auth service signs.
#[derive(Debug, Deserialize)]
#[cfg_attr(any(feature = "USE_ONLY_IN_AUTH_SERVICE", test), derive(Serialize))]
pub struct SessionClaims {
    /// User ID (UUID string).
    pub sub: String,
    pub role: UserRole,
    pub email: String,
    /// Session row ID (UUID string).
    pub sid: String,
    /// Expiration timestamp (seconds since UNIX epoch).
    pub exp: u64,
}

/// Decode and validate a session JWT.
///
/// Validation: HS256, exp checked, required claims `exp` + `sub`.
/// Default leeway (60s) tolerates clock skew between instances.
fn decode_jwt(token: &str, secret: &str) -> Result<SessionClaims, TokenError> {
    let mut validation = Validation::new(jsonwebtoken::Algorithm::HS256);
    validation.validate_exp = true;
    validation.required_spec_claims.clear();
    validation.set_required_spec_claims(&["exp", "sub"]);

    let data = decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
        jsonwebtoken::errors::ErrorKind::InvalidSignature => TokenError::InvalidSignature,
        _ => TokenError::Malformed,
    })?;

    Ok(data.claims)
}

/// Validate a session cookie value and parse its identity fields.
pub fn validate_session_token(token: &str, secret: &str) -> Result<SessionTokenInfo, TokenError> {
    let claims = decode_jwt(token, secret)?;
    let user_id = claims
        .sub
        .parse::<Uuid>()
        .map_err(|_| TokenError::Malformed)?;
    let session_id = claims
        .sid
        .parse::<Uuid>()
        .map_err(|_| TokenError::Malformed)?;
    Ok(SessionTokenInfo {
        user_id,
        role: claims.role,
        email: claims.email,
        session_id,
        expires_at: claims.exp,
    })
}
