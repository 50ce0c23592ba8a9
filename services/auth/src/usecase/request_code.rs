//! Request-code flow.
//!
//! Every path through [`RequestCodeUseCase::execute`] succeeds from the
//! caller's point of view. Whether a code was actually sent, suppressed by the
//! risk engine or refused by the allow-list is recorded in the audit trail and
//! nowhere else, so the endpoint cannot be used to probe which addresses are
//! registered.

use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::domain::repository::{AllowlistRepository, AuditRepository, Mailer, OtpRepository};
use crate::domain::types::{AuthEvent, AuthEventType, AuthOutcome, OTP_TTL_SECS, OtpCode};
use crate::error::AuthServiceError;
use crate::otp::{generate_code, hash_otp};
use crate::rate_limit::{CounterStore, RateLimiter, limits};
use crate::request_meta::RequestMeta;
use crate::risk::{RiskPolicy, RiskSignals};

/// Outcome of a request-code call. Deliberately opaque: handlers can only
/// turn it into the one generic response, never branch on what happened.
#[derive(Debug)]
pub struct CodeRequested {
    _outcome: Outcome,
}

#[derive(Debug, Clone, Copy)]
enum Outcome {
    Sent,
    Blocked,
    NotAllowlisted,
}

impl CodeRequested {
    fn sent() -> Self {
        Self { _outcome: Outcome::Sent }
    }

    fn blocked() -> Self {
        Self { _outcome: Outcome::Blocked }
    }

    fn not_allowlisted() -> Self {
        Self { _outcome: Outcome::NotAllowlisted }
    }
}

pub struct RequestCodeUseCase<A, O, D, M, C: CounterStore> {
    allowlist: A,
    otp_codes: O,
    audit: D,
    mailer: M,
    limiter: RateLimiter<C>,
    policy: RiskPolicy,
    otp_secret: String,
}

impl<A, O, D, M, C> RequestCodeUseCase<A, O, D, M, C>
where
    A: AllowlistRepository,
    O: OtpRepository,
    D: AuditRepository,
    M: Mailer,
    C: CounterStore,
{
    pub fn new(
        allowlist: A,
        otp_codes: O,
        audit: D,
        mailer: M,
        limiter: RateLimiter<C>,
        policy: RiskPolicy,
        otp_secret: String,
    ) -> Self {
        Self {
            allowlist,
            otp_codes,
            audit,
            mailer,
            limiter,
            policy,
            otp_secret,
        }
    }

    /// `email` must already be validated and normalized.
    pub async fn execute(
        &self,
        email: &str,
        meta: &RequestMeta,
    ) -> Result<CodeRequested, AuthServiceError> {
        let by_email_key = format!("request:email:{email}");
        let by_email_day_key = format!("request:email-day:{email}");
        let by_email_ip_key = format!("request:email-ip:{email}:{}", meta.ip_hash);
        let by_ip_key = format!("request:ip:{}", meta.ip_hash);
        let (by_email, by_email_day, by_email_ip, by_ip) = tokio::join!(
            self.limiter
                .check(&by_email_key, limits::REQUEST_BY_EMAIL_15M),
            self.limiter
                .check(&by_email_day_key, limits::REQUEST_BY_EMAIL_DAY),
            self.limiter
                .check(&by_email_ip_key, limits::REQUEST_BY_EMAIL_IP_15M),
            self.limiter
                .check(&by_ip_key, limits::REQUEST_BY_IP_10M_SOFT),
        );

        let email_limited = !by_email.allowed || !by_email_day.allowed || !by_email_ip.allowed;
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
            ip_soft_limited: !by_ip.allowed,
            email_limited,
            email_failures_last_hour: failures.by_email,
            ip_failures_last_hour: failures.by_ip,
            ua_failures_last_hour: failures.by_user_agent,
        });

        // The delay applies to every outcome, otherwise response latency
        // would distinguish suppressed requests from sent ones.
        if decision.soft_delay_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(decision.soft_delay_ms)).await;
        }

        let event = |outcome: AuthOutcome| {
            AuthEvent::new(AuthEventType::RequestCode, outcome)
                .email(email)
                .client(&meta.ip_hash, &meta.user_agent_hash)
                .risk_score(decision.score)
        };

        if decision.hard_block {
            self.audit
                .append(event(AuthOutcome::Blocked).reason("risk-hard-block"))
                .await?;
            return Ok(CodeRequested::blocked());
        }

        if email_limited {
            self.audit
                .append(event(AuthOutcome::Blocked).reason("email-rate-limited"))
                .await?;
            return Ok(CodeRequested::blocked());
        }

        if !self.allowlist.is_active(email).await? {
            self.audit
                .append(event(AuthOutcome::Failure).reason("email-not-allowlisted"))
                .await?;
            return Ok(CodeRequested::not_allowlisted());
        }

        let code = generate_code();
        let now = Utc::now();
        self.otp_codes
            .issue(OtpCode {
                id: Uuid::new_v4(),
                email: email.to_owned(),
                code_hash: hash_otp(email, &code, &self.otp_secret),
                attempt_count: 0,
                expires_at: now + Duration::seconds(OTP_TTL_SECS),
                consumed_at: None,
                created_at: now,
            })
            .await?;

        self.mailer.send_code(email, &code).await?;

        self.audit.append(event(AuthOutcome::Success)).await?;
        Ok(CodeRequested::sent())
    }
}
