/// Auth service configuration loaded from environment variables.
#[derive(Debug)]
pub struct AuthConfig {
    /// PostgreSQL connection URL.
    pub database_url: String,
    /// Redis connection URL. When absent, rate limiting runs on in-process
    /// counters only (per instance, not shared).
    pub redis_url: Option<String>,
    /// HMAC secret for signing session JWTs.
    pub session_secret: String,
    /// HMAC secret for hashing one-time codes.
    pub otp_hash_secret: String,
    /// Salt for pseudonymizing IPs and user agents in the audit trail.
    pub audit_hash_salt: String,
    /// Resend API key. When absent, codes are logged instead of emailed.
    pub resend_api_key: Option<String>,
    /// Sender address for code emails.
    pub resend_from_email: Option<String>,
    /// TCP port to listen on (default 3112). Env var: `AUTH_PORT`.
    pub auth_port: u16,
}

fn optional_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

impl AuthConfig {
    pub fn from_env() -> Self {
        Self {
            database_url: std::env::var("DATABASE_URL").expect("DATABASE_URL"),
            redis_url: optional_env("REDIS_URL"),
            session_secret: std::env::var("SESSION_SECRET").expect("SESSION_SECRET"),
            otp_hash_secret: std::env::var("OTP_HASH_SECRET").expect("OTP_HASH_SECRET"),
            audit_hash_salt: std::env::var("AUDIT_HASH_SALT").expect("AUDIT_HASH_SALT"),
            resend_api_key: optional_env("RESEND_API_KEY"),
            resend_from_email: optional_env("RESEND_FROM_EMAIL"),
            auth_port: std::env::var("AUTH_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3112),
        }
    }
}
