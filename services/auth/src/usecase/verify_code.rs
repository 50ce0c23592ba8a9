//! Verify-code flow.
//!
//! Unlike request-code this endpoint is deliberately distinguishable: the
//! caller already holds a code, so telling them it expired versus it being
//! wrong leaks nothing about which addresses exist but saves a legitimate
//! member from retyping a dead code.

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::domain::repository::{
    AllowlistRepository, AuditRepository, OtpRepository, SessionRepository, UserRepository,
};
use crate::domain::types::{
    AuthEvent, AuthEventType, AuthOutcome, AuthUser, OTP_MAX_ATTEMPTS, Session,
};
use crate::error::AuthServiceError;
use crate::otp::verify_otp_hash;
use crate::rate_limit::{CounterStore, RateLimiter, limits};
use crate::request_meta::RequestMeta;
use crate::risk::{RiskPolicy, RiskSignals};
use crate::usecase::session::sign_session_token;

use brannboll_auth_types::cookie::SESSION_TTL_SECS;

#[derive(Debug)]
pub struct VerifyCodeOutput {
    pub user: AuthUser,
    pub token: String,
    pub session_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

pub struct VerifyCodeUseCase<A, O, U, S, D, C: CounterStore> {
    allowlist: A,
    otp_codes: O,
    users: U,
    sessions: S,
    audit: D,
    limiter: RateLimiter<C>,
    policy: RiskPolicy,
    otp_secret: String,
    session_secret: String,
}

impl<A, O, U, S, D, C> VerifyCodeUseCase<A, O, U, S, D, C>
where
    A: AllowlistRepository,
    O: OtpRepository,
    U: UserRepository,
    S: SessionRepository,
    D: AuditRepository,
    C: CounterStore,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        allowlist: A,
        otp_codes: O,
        users: U,
        sessions: S,
        audit: D,
        limiter: RateLimiter<C>,
        policy: RiskPolicy,
        otp_secret: String,
        session_secret: String,
    ) -> Self {
        Self {
            allowlist,
            otp_codes,
            users,
            sessions,
            audit,
            limiter,
            policy,
            otp_secret,
            session_secret,
        }
    }

    /// `email` must already be validated and normalized, `code` shape-checked.
    pub async fn execute(
        &self,
        email: &str,
        code: &str,
        meta: &RequestMeta,
    ) -> Result<VerifyCodeOutput, AuthServiceError> {
        let verify_limit = self
            .limiter
            .check(&format!("verify:email:{email}"), limits::VERIFY_BY_EMAIL_15M)
            .await;

        let failures = self
            .audit
            .count_failures_since(
                email,
                &meta.ip_hash,
                &meta.user_agent_hash,
                Utc::now() - Duration::hours(1),
            )
            .await?;

        let decision = self.policy.decide(&RiskSignals {
            ip_soft_limited: false,
            email_limited: !verify_limit.allowed,
            email_failures_last_hour: failures.by_email,
            ip_failures_last_hour: failures.by_ip,
            ua_failures_last_hour: failures.by_user_agent,
        });

        if decision.soft_delay_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(decision.soft_delay_ms)).await;
        }

        let event = |outcome: AuthOutcome| {
            AuthEvent::new(AuthEventType::VerifyCode, outcome)
                .email(email)
                .client(&meta.ip_hash, &meta.user_agent_hash)
                .risk_score(decision.score)
        };

        if !verify_limit.allowed || decision.hard_block {
            let reason = if decision.hard_block {
                "risk-hard-block"
            } else {
                "verify-rate-limit"
            };
            self.audit
                .append(event(AuthOutcome::Blocked).reason(reason))
                .await?;
            return Err(AuthServiceError::RateLimitedSoft {
                retry_after_ms: verify_limit.retry_after_ms,
            });
        }

        if !self.allowlist.is_active(email).await? {
            self.audit
                .append(event(AuthOutcome::Failure).reason("email-not-allowlisted"))
                .await?;
            return Err(AuthServiceError::NotAllowedEmail);
        }

        let Some(otp) = self.otp_codes.find_latest_unconsumed(email).await? else {
            self.audit
                .append(event(AuthOutcome::Failure).reason("otp-not-found"))
                .await?;
            return Err(AuthServiceError::InvalidCode);
        };

        let now = Utc::now();
        if otp.is_expired(now) {
            // Dead code; consume it so it cannot soak further attempts.
            self.otp_codes.consume(otp.id).await?;
            self.audit
                .append(event(AuthOutcome::Failure).reason("otp-expired"))
                .await?;
            return Err(AuthServiceError::CodeExpired);
        }

        if otp.attempt_count >= OTP_MAX_ATTEMPTS {
            self.audit
                .append(event(AuthOutcome::Blocked).reason("otp-attempts-exceeded"))
                .await?;
            return Err(AuthServiceError::RateLimitedSoft { retry_after_ms: 0 });
        }

        if !verify_otp_hash(email, code, &self.otp_secret, &otp.code_hash) {
            self.otp_codes.record_failed_attempt(otp.id).await?;
            self.audit
                .append(event(AuthOutcome::Failure).reason("otp-invalid"))
                .await?;
            return Err(AuthServiceError::InvalidCode);
        }

        let user = self.users.find_or_create_member(email).await?;
        self.otp_codes.consume(otp.id).await?;

        let session_id = Uuid::new_v4();
        let expires_at = now + Duration::seconds(SESSION_TTL_SECS as i64);
        self.sessions
            .create(Session {
                id: session_id,
                user_id: user.id,
                expires_at,
                revoked_at: None,
                ip_hash: Some(meta.ip_hash.clone()),
                user_agent_hash: Some(meta.user_agent_hash.clone()),
                created_at: now,
            })
            .await?;

        let token = sign_session_token(&user, session_id, expires_at, &self.session_secret)?;

        self.audit
            .append(event(AuthOutcome::Success).actor(user.id))
            .await?;

        Ok(VerifyCodeOutput {
            user,
            token,
            session_id,
            expires_at,
        })
    }
}
