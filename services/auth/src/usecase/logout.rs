use crate::domain::repository::{AuditRepository, SessionRepository};
use crate::domain::types::{AuthEvent, AuthEventType, AuthOutcome, SessionUser};
use crate::error::AuthServiceError;
use crate::request_meta::RequestMeta;

pub struct LogoutUseCase<S, D> {
    sessions: S,
    audit: D,
}

impl<S, D> LogoutUseCase<S, D>
where
    S: SessionRepository,
    D: AuditRepository,
{
    pub fn new(sessions: S, audit: D) -> Self {
        Self { sessions, audit }
    }

    /// Revoke the caller's session. Idempotent; a repeated logout with a
    /// still-valid token revokes nothing and is still a success.
    pub async fn execute(
        &self,
        user: &SessionUser,
        meta: &RequestMeta,
    ) -> Result<(), AuthServiceError> {
        self.sessions.revoke(user.session_id).await?;
        self.audit
            .append(
                AuthEvent::new(AuthEventType::Logout, AuthOutcome::Success)
                    .actor(user.id)
                    .email(&user.email)
                    .client(&meta.ip_hash, &meta.user_agent_hash),
            )
            .await?;
        Ok(())
    }
}
