use anyhow::Context;
use brannboll_auth_types::token::{SessionClaims, validate_session_token};
use chrono::{DateTime, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use uuid::Uuid;

use crate::domain::repository::{SessionRepository, UserRepository};
use crate::domain::types::{AuthUser, SessionUser};
use crate::error::AuthServiceError;

/// Sign a session JWT. `exp` mirrors the session row's `expires_at`, so the
/// token can never outlive the row it points at.
pub fn sign_session_token(
    user: &AuthUser,
    session_id: Uuid,
    expires_at: DateTime<Utc>,
    secret: &str,
) -> Result<String, AuthServiceError> {
    let claims = SessionClaims {
        sub: user.id.to_string(),
        role: user.role,
        email: user.email.clone(),
        sid: session_id.to_string(),
        exp: u64::try_from(expires_at.timestamp()).unwrap_or(0),
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .context("failed to sign session token")?;
    Ok(token)
}

/// Resolve a session cookie to the current user.
///
/// Two gates in order: the stateless token check, then the session row. A
/// token that validates but whose row is revoked or gone resolves to `None`,
/// which is what makes logout effective before the JWT expires.
pub struct ReadSessionUseCase<S, U> {
    sessions: S,
    users: U,
    session_secret: String,
}

impl<S, U> ReadSessionUseCase<S, U>
where
    S: SessionRepository,
    U: UserRepository,
{
    pub fn new(sessions: S, users: U, session_secret: String) -> Self {
        Self {
            sessions,
            users,
            session_secret,
        }
    }

    pub async fn execute(&self, token: &str) -> Result<Option<SessionUser>, AuthServiceError> {
        let Ok(info) = validate_session_token(token, &self.session_secret) else {
            return Ok(None);
        };

        let Some(session) = self
            .sessions
            .find_valid(info.session_id, info.user_id)
            .await?
        else {
            return Ok(None);
        };

        // Identity fields come from the user row, not the token, so renames
        // and role changes take effect on the next request.
        let Some(user) = self.users.find_by_id(session.user_id).await? else {
            return Ok(None);
        };

        Ok(Some(SessionUser {
            id: user.id,
            email: user.email,
            name: user.name,
            role: user.role,
            session_id: session.id,
        }))
    }
}
