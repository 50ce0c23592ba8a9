use brannboll_auth_types::role::UserRole;
use chrono::{DateTime, Utc};
use serde_json::json;
use uuid::Uuid;

/// One-time codes live for ten minutes.
pub const OTP_TTL_SECS: i64 = 600;
/// A code dies after this many wrong guesses.
pub const OTP_MAX_ATTEMPTS: i32 = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub role: UserRole,
}

#[derive(Debug, Clone)]
pub struct OtpCode {
    pub id: Uuid,
    pub email: String,
    pub code_hash: String,
    pub attempt_count: i32,
    pub expires_at: DateTime<Utc>,
    pub consumed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl OtpCode {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

#[derive(Debug, Clone)]
pub struct Session {
    pub id: Uuid,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub ip_hash: Option<String>,
    pub user_agent_hash: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// A session is valid until it expires or is revoked, whichever first.
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        self.revoked_at.is_none() && self.expires_at > now
    }
}

/// The authenticated caller as resolved from a session token.
#[derive(Debug, Clone)]
pub struct SessionUser {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub role: UserRole,
    pub session_id: Uuid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEventType {
    RequestCode,
    VerifyCode,
    Logout,
}

impl AuthEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RequestCode => "request_code",
            Self::VerifyCode => "verify_code",
            Self::Logout => "logout",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthOutcome {
    Success,
    Failure,
    Blocked,
}

impl AuthOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
            Self::Blocked => "blocked",
        }
    }
}

/// Append-only audit record. Built with the chained setters below so call
/// sites only mention the fields they actually have.
#[derive(Debug, Clone)]
pub struct AuthEvent {
    pub id: Uuid,
    pub event_type: AuthEventType,
    pub outcome: AuthOutcome,
    pub email: Option<String>,
    pub actor_user_id: Option<Uuid>,
    pub ip_hash: Option<String>,
    pub user_agent_hash: Option<String>,
    pub risk_score: i32,
    pub meta: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

impl AuthEvent {
    pub fn new(event_type: AuthEventType, outcome: AuthOutcome) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_type,
            outcome,
            email: None,
            actor_user_id: None,
            ip_hash: None,
            user_agent_hash: None,
            risk_score: 0,
            meta: None,
            created_at: Utc::now(),
        }
    }

    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn actor(mut self, user_id: Uuid) -> Self {
        self.actor_user_id = Some(user_id);
        self
    }

    pub fn client(mut self, ip_hash: impl Into<String>, user_agent_hash: impl Into<String>) -> Self {
        self.ip_hash = Some(ip_hash.into());
        self.user_agent_hash = Some(user_agent_hash.into());
        self
    }

    pub fn risk_score(mut self, score: u32) -> Self {
        self.risk_score = i32::try_from(score).unwrap_or(i32::MAX);
        self
    }

    pub fn reason(mut self, reason: &str) -> Self {
        self.meta = Some(json!({ "reason": reason }));
        self
    }
}

/// Failure counts over a recent window, grouped by the three client
/// dimensions the risk engine weighs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FailureCounts {
    pub by_email: u64,
    pub by_ip: u64,
    pub by_user_agent: u64,
}
