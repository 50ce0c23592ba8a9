//! Ports the use cases depend on. Postgres implementations live in
//! [`crate::infra::db`], the outbound mailer in [`crate::infra::email`].

#![allow(async_fn_in_trait)]

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::types::{AuthEvent, AuthUser, FailureCounts, OtpCode, Session};
use crate::error::AuthServiceError;

pub trait AllowlistRepository: Send + Sync {
    /// Whether the email has an active allow-list entry.
    async fn is_active(&self, email: &str) -> Result<bool, AuthServiceError>;
}

pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<AuthUser>, AuthServiceError>;

    /// Look up the user for an allow-listed email, creating a member row on
    /// first login. Must be race-safe under concurrent first logins.
    async fn find_or_create_member(&self, email: &str) -> Result<AuthUser, AuthServiceError>;
}

pub trait OtpRepository: Send + Sync {
    /// Atomically consume every outstanding code for the email and insert the
    /// new one, so at most one code per email is live.
    async fn issue(&self, code: OtpCode) -> Result<(), AuthServiceError>;

    async fn find_latest_unconsumed(
        &self,
        email: &str,
    ) -> Result<Option<OtpCode>, AuthServiceError>;

    async fn record_failed_attempt(&self, id: Uuid) -> Result<(), AuthServiceError>;

    async fn consume(&self, id: Uuid) -> Result<(), AuthServiceError>;
}

pub trait SessionRepository: Send + Sync {
    async fn create(&self, session: Session) -> Result<(), AuthServiceError>;

    /// A session that exists but is expired or revoked resolves to `None`.
    async fn find_valid(
        &self,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Session>, AuthServiceError>;

    /// Revoking an already revoked or unknown session is a no-op.
    async fn revoke(&self, id: Uuid) -> Result<(), AuthServiceError>;
}

pub trait AuditRepository: Send + Sync {
    async fn append(&self, event: AuthEvent) -> Result<(), AuthServiceError>;

    /// Count failure outcomes since `since`, per dimension. Blocked rows do
    /// not count; the risk engine must not feed on its own verdicts.
    async fn count_failures_since(
        &self,
        email: &str,
        ip_hash: &str,
        user_agent_hash: &str,
        since: DateTime<Utc>,
    ) -> Result<FailureCounts, AuthServiceError>;
}

pub trait Mailer: Send + Sync {
    async fn send_code(&self, email: &str, code: &str) -> Result<(), AuthServiceError>;
}
