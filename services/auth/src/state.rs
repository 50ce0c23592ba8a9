use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::infra::db::{
    DbAllowlistRepository, DbAuditRepository, DbOtpRepository, DbSessionRepository,
    DbUserRepository,
};
use crate::infra::email::ResendMailer;
use crate::infra::redis::RedisCounterStore;
use crate::rate_limit::RateLimiter;
use crate::risk::RiskPolicy;

/// Shared service state. Repositories are built per request from the pooled
/// connection, so handlers stay generic over the repository traits.
#[derive(Clone)]
pub struct AppState {
    db: Arc<DatabaseConnection>,
    pub limiter: RateLimiter<RedisCounterStore>,
    pub mailer: ResendMailer,
    pub risk_policy: RiskPolicy,
    pub session_secret: String,
    pub otp_hash_secret: String,
    pub audit_hash_salt: String,
}

impl AppState {
    pub fn new(
        db: DatabaseConnection,
        limiter: RateLimiter<RedisCounterStore>,
        mailer: ResendMailer,
        session_secret: String,
        otp_hash_secret: String,
        audit_hash_salt: String,
    ) -> Self {
        Self {
            db: Arc::new(db),
            limiter,
            mailer,
            risk_policy: RiskPolicy::default(),
            session_secret,
            otp_hash_secret,
            audit_hash_salt,
        }
    }

    pub fn allowlist(&self) -> DbAllowlistRepository {
        DbAllowlistRepository::new(self.db.clone())
    }

    pub fn users(&self) -> DbUserRepository {
        DbUserRepository::new(self.db.clone())
    }

    pub fn otp_codes(&self) -> DbOtpRepository {
        DbOtpRepository::new(self.db.clone())
    }

    pub fn sessions(&self) -> DbSessionRepository {
        DbSessionRepository::new(self.db.clone())
    }

    pub fn audit(&self) -> DbAuditRepository {
        DbAuditRepository::new(self.db.clone())
    }
}
