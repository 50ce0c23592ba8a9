//! In-memory repository doubles for the use case tests. Each mock exposes its
//! backing `Arc<Mutex<Vec<_>>>` so tests can seed state and assert on what
//! the use case wrote.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use brannboll_auth::crypto::hash_identifier;
use brannboll_auth::domain::repository::{
    AllowlistRepository, AuditRepository, Mailer, OtpRepository, SessionRepository,
    UserRepository,
};
use brannboll_auth::domain::types::{
    AuthEvent, AuthOutcome, AuthUser, FailureCounts, OtpCode, Session,
};
use brannboll_auth::error::AuthServiceError;
use brannboll_auth::rate_limit::{CounterEntry, CounterStore, RateLimiter};
use brannboll_auth::request_meta::RequestMeta;
use brannboll_auth::risk::RiskPolicy;
use brannboll_auth::usecase::logout::LogoutUseCase;
use brannboll_auth::usecase::request_code::RequestCodeUseCase;
use brannboll_auth::usecase::session::ReadSessionUseCase;
use brannboll_auth::usecase::verify_code::VerifyCodeUseCase;
use brannboll_auth_types::role::UserRole;

pub const OTP_SECRET: &str = "test-otp-secret";
pub const SESSION_SECRET: &str = "test-session-secret";
pub const AUDIT_SALT: &str = "test-audit-salt";

/// Counter store stand-in; the tests always run the in-process limiter.
pub struct NoStore;

impl CounterStore for NoStore {
    async fn incr_window(&self, _: &str, _: u64) -> Result<CounterEntry, AuthServiceError> {
        unreachable!("tests run the in-process limiter")
    }
}

#[derive(Clone, Default)]
pub struct MockAllowlist {
    pub entries: Arc<Mutex<Vec<String>>>,
}

impl AllowlistRepository for MockAllowlist {
    async fn is_active(&self, email: &str) -> Result<bool, AuthServiceError> {
        Ok(self.entries.lock().unwrap().iter().any(|e| e == email))
    }
}

#[derive(Clone, Default)]
pub struct MockOtpRepo {
    pub codes: Arc<Mutex<Vec<OtpCode>>>,
}

impl OtpRepository for MockOtpRepo {
    async fn issue(&self, code: OtpCode) -> Result<(), AuthServiceError> {
        let mut codes = self.codes.lock().unwrap();
        for existing in codes
            .iter_mut()
            .filter(|c| c.email == code.email && c.consumed_at.is_none())
        {
            existing.consumed_at = Some(code.created_at);
        }
        codes.push(code);
        Ok(())
    }

    async fn find_latest_unconsumed(
        &self,
        email: &str,
    ) -> Result<Option<OtpCode>, AuthServiceError> {
        Ok(self
            .codes
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.email == email && c.consumed_at.is_none())
            .max_by_key(|c| c.created_at)
            .cloned())
    }

    async fn record_failed_attempt(&self, id: Uuid) -> Result<(), AuthServiceError> {
        for code in self.codes.lock().unwrap().iter_mut() {
            if code.id == id {
                code.attempt_count += 1;
            }
        }
        Ok(())
    }

    async fn consume(&self, id: Uuid) -> Result<(), AuthServiceError> {
        for code in self.codes.lock().unwrap().iter_mut() {
            if code.id == id && code.consumed_at.is_none() {
                code.consumed_at = Some(Utc::now());
            }
        }
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct MockUserRepo {
    pub users: Arc<Mutex<Vec<AuthUser>>>,
}

impl UserRepository for MockUserRepo {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<AuthUser>, AuthServiceError> {
        Ok(self.users.lock().unwrap().iter().find(|u| u.id == id).cloned())
    }

    async fn find_or_create_member(&self, email: &str) -> Result<AuthUser, AuthServiceError> {
        let mut users = self.users.lock().unwrap();
        if let Some(user) = users.iter().find(|u| u.email == email) {
            return Ok(user.clone());
        }
        let user = AuthUser {
            id: Uuid::new_v4(),
            email: email.to_owned(),
            name: None,
            role: UserRole::Member,
        };
        users.push(user.clone());
        Ok(user)
    }
}

#[derive(Clone, Default)]
pub struct MockSessionRepo {
    pub sessions: Arc<Mutex<Vec<Session>>>,
}

impl SessionRepository for MockSessionRepo {
    async fn create(&self, session: Session) -> Result<(), AuthServiceError> {
        self.sessions.lock().unwrap().push(session);
        Ok(())
    }

    async fn find_valid(
        &self,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Session>, AuthServiceError> {
        let now = Utc::now();
        Ok(self
            .sessions
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.id == id && s.user_id == user_id && s.is_valid(now))
            .cloned())
    }

    async fn revoke(&self, id: Uuid) -> Result<(), AuthServiceError> {
        for session in self.sessions.lock().unwrap().iter_mut() {
            if session.id == id && session.revoked_at.is_none() {
                session.revoked_at = Some(Utc::now());
            }
        }
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct MockAudit {
    pub events: Arc<Mutex<Vec<AuthEvent>>>,
}

impl MockAudit {
    pub fn last_reason(&self) -> Option<String> {
        self.events
            .lock()
            .unwrap()
            .last()
            .and_then(|e| e.meta.as_ref())
            .and_then(|m| m["reason"].as_str().map(str::to_owned))
    }

    pub fn last_outcome(&self) -> Option<AuthOutcome> {
        self.events.lock().unwrap().last().map(|e| e.outcome)
    }
}

impl AuditRepository for MockAudit {
    async fn append(&self, event: AuthEvent) -> Result<(), AuthServiceError> {
        self.events.lock().unwrap().push(event);
        Ok(())
    }

    async fn count_failures_since(
        &self,
        email: &str,
        ip_hash: &str,
        user_agent_hash: &str,
        since: DateTime<Utc>,
    ) -> Result<FailureCounts, AuthServiceError> {
        let mut counts = FailureCounts::default();
        for event in self.events.lock().unwrap().iter() {
            if event.created_at < since || event.outcome != AuthOutcome::Failure {
                continue;
            }
            if event.email.as_deref() == Some(email) {
                counts.by_email += 1;
            }
            if event.ip_hash.as_deref() == Some(ip_hash) {
                counts.by_ip += 1;
            }
            if event.user_agent_hash.as_deref() == Some(user_agent_hash) {
                counts.by_user_agent += 1;
            }
        }
        Ok(counts)
    }
}

#[derive(Clone, Default)]
pub struct MockMailer {
    pub sent: Arc<Mutex<Vec<(String, String)>>>,
}

impl MockMailer {
    pub fn last_code(&self) -> Option<String> {
        self.sent.lock().unwrap().last().map(|(_, code)| code.clone())
    }
}

impl Mailer for MockMailer {
    async fn send_code(&self, email: &str, code: &str) -> Result<(), AuthServiceError> {
        self.sent
            .lock()
            .unwrap()
            .push((email.to_owned(), code.to_owned()));
        Ok(())
    }
}

pub type RequestUc = RequestCodeUseCase<MockAllowlist, MockOtpRepo, MockAudit, MockMailer, NoStore>;
pub type VerifyUc =
    VerifyCodeUseCase<MockAllowlist, MockOtpRepo, MockUserRepo, MockSessionRepo, MockAudit, NoStore>;

/// One set of shared mocks wired the way the service wires its repositories.
#[derive(Clone, Default)]
pub struct TestEnv {
    pub allowlist: MockAllowlist,
    pub otp_codes: MockOtpRepo,
    pub users: MockUserRepo,
    pub sessions: MockSessionRepo,
    pub audit: MockAudit,
    pub mailer: MockMailer,
}

impl TestEnv {
    pub fn with_allowlist(emails: &[&str]) -> Self {
        let env = Self::default();
        env.allowlist
            .entries
            .lock()
            .unwrap()
            .extend(emails.iter().map(|e| e.to_string()));
        env
    }

    pub fn request_code(&self) -> RequestUc {
        RequestCodeUseCase::new(
            self.allowlist.clone(),
            self.otp_codes.clone(),
            self.audit.clone(),
            self.mailer.clone(),
            RateLimiter::in_process(),
            RiskPolicy::default(),
            OTP_SECRET.to_owned(),
        )
    }

    pub fn verify_code(&self) -> VerifyUc {
        VerifyCodeUseCase::new(
            self.allowlist.clone(),
            self.otp_codes.clone(),
            self.users.clone(),
            self.sessions.clone(),
            self.audit.clone(),
            RateLimiter::in_process(),
            RiskPolicy::default(),
            OTP_SECRET.to_owned(),
            SESSION_SECRET.to_owned(),
        )
    }

    pub fn read_session(&self) -> ReadSessionUseCase<MockSessionRepo, MockUserRepo> {
        ReadSessionUseCase::new(
            self.sessions.clone(),
            self.users.clone(),
            SESSION_SECRET.to_owned(),
        )
    }

    pub fn logout(&self) -> LogoutUseCase<MockSessionRepo, MockAudit> {
        LogoutUseCase::new(self.sessions.clone(), self.audit.clone())
    }
}

pub fn meta() -> RequestMeta {
    RequestMeta {
        ip_hash: hash_identifier("203.0.113.9", AUDIT_SALT),
        user_agent_hash: hash_identifier("test-agent/1.0", AUDIT_SALT),
    }
}
