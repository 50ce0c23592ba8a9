use brannboll_auth::domain::types::{AuthOutcome, OTP_MAX_ATTEMPTS};
use brannboll_auth::error::AuthServiceError;
use brannboll_auth_types::role::UserRole;
use brannboll_auth_types::token::validate_session_token;

use super::helpers::{SESSION_SECRET, TestEnv, meta};

const EMAIL: &str = "member@example.se";

#[tokio::test]
async fn valid_code_signs_in_and_creates_a_session() {
    let env = TestEnv::with_allowlist(&[EMAIL]);
    env.request_code().execute(EMAIL, &meta()).await.unwrap();
    let code = env.mailer.last_code().unwrap();

    let output = env.verify_code().execute(EMAIL, &code, &meta()).await.unwrap();

    assert_eq!(output.user.email, EMAIL);
    assert_eq!(output.user.role, UserRole::Member);

    // The token binds the user and the session row.
    let info = validate_session_token(&output.token, SESSION_SECRET).unwrap();
    assert_eq!(info.user_id, output.user.id);
    assert_eq!(info.session_id, output.session_id);

    let sessions = env.sessions.sessions.lock().unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].id, output.session_id);
    assert!(sessions[0].ip_hash.is_some());

    // The code is single use.
    assert!(env.otp_codes.codes.lock().unwrap()[0].consumed_at.is_some());
    assert_eq!(env.audit.last_outcome(), Some(AuthOutcome::Success));
    assert_eq!(
        env.audit.events.lock().unwrap().last().unwrap().actor_user_id,
        Some(output.user.id)
    );
}

#[tokio::test]
async fn consumed_code_cannot_be_replayed() {
    let env = TestEnv::with_allowlist(&[EMAIL]);
    env.request_code().execute(EMAIL, &meta()).await.unwrap();
    let code = env.mailer.last_code().unwrap();

    let verify = env.verify_code();
    verify.execute(EMAIL, &code, &meta()).await.unwrap();

    let err = verify.execute(EMAIL, &code, &meta()).await.unwrap_err();
    assert!(matches!(err, AuthServiceError::InvalidCode));
    assert_eq!(env.audit.last_reason().as_deref(), Some("otp-not-found"));
}

#[tokio::test]
async fn wrong_code_is_counted_and_distinguishable() {
    let env = TestEnv::with_allowlist(&[EMAIL]);
    env.request_code().execute(EMAIL, &meta()).await.unwrap();

    // Generated codes never start with a zero, so this can never collide.
    let err = env
        .verify_code()
        .execute(EMAIL, "000000", &meta())
        .await
        .unwrap_err();

    assert!(matches!(err, AuthServiceError::InvalidCode));
    assert_eq!(env.otp_codes.codes.lock().unwrap()[0].attempt_count, 1);
    assert_eq!(env.audit.last_reason().as_deref(), Some("otp-invalid"));
}

#[tokio::test]
async fn missing_code_reports_invalid_not_expired() {
    let env = TestEnv::with_allowlist(&[EMAIL]);

    let err = env
        .verify_code()
        .execute(EMAIL, "123456", &meta())
        .await
        .unwrap_err();

    assert!(matches!(err, AuthServiceError::InvalidCode));
    assert_eq!(env.audit.last_reason().as_deref(), Some("otp-not-found"));
}

#[tokio::test(start_paused = true)]
async fn expired_code_is_reported_as_expired_and_killed() {
    let env = TestEnv::with_allowlist(&[EMAIL]);
    env.request_code().execute(EMAIL, &meta()).await.unwrap();
    let code = env.mailer.last_code().unwrap();

    // Back-date the issued code past its TTL.
    {
        let mut codes = env.otp_codes.codes.lock().unwrap();
        codes[0].expires_at = chrono::Utc::now() - chrono::Duration::seconds(1);
    }

    let verify = env.verify_code();
    let err = verify.execute(EMAIL, &code, &meta()).await.unwrap_err();
    assert!(matches!(err, AuthServiceError::CodeExpired));
    assert_eq!(env.audit.last_reason().as_deref(), Some("otp-expired"));

    // The dead code was consumed; the right code now reads as not found.
    let err = verify.execute(EMAIL, &code, &meta()).await.unwrap_err();
    assert!(matches!(err, AuthServiceError::InvalidCode));
    assert_eq!(env.audit.last_reason().as_deref(), Some("otp-not-found"));
}

#[tokio::test(start_paused = true)]
async fn code_dies_after_max_wrong_guesses() {
    let env = TestEnv::with_allowlist(&[EMAIL]);
    env.request_code().execute(EMAIL, &meta()).await.unwrap();
    let code = env.mailer.last_code().unwrap();

    let verify = env.verify_code();
    for _ in 0..OTP_MAX_ATTEMPTS {
        let err = verify.execute(EMAIL, "000000", &meta()).await.unwrap_err();
        assert!(matches!(err, AuthServiceError::InvalidCode));
    }

    // Even the correct code is refused once the attempt budget is spent.
    let err = verify.execute(EMAIL, &code, &meta()).await.unwrap_err();
    assert!(matches!(err, AuthServiceError::RateLimitedSoft { .. }));
    assert_eq!(env.audit.last_reason().as_deref(), Some("otp-attempts-exceeded"));
    assert_eq!(
        env.otp_codes.codes.lock().unwrap()[0].attempt_count,
        OTP_MAX_ATTEMPTS
    );
}

#[tokio::test]
async fn not_allowlisted_email_is_refused() {
    let env = TestEnv::with_allowlist(&[]);

    let err = env
        .verify_code()
        .execute(EMAIL, "123456", &meta())
        .await
        .unwrap_err();

    assert!(matches!(err, AuthServiceError::NotAllowedEmail));
    assert_eq!(env.audit.last_reason().as_deref(), Some("email-not-allowlisted"));
}

#[tokio::test(start_paused = true)]
async fn verify_window_limits_even_successful_logins() {
    let env = TestEnv::with_allowlist(&[EMAIL]);
    let verify = env.verify_code();

    // Twenty clean sign-ins, each with a freshly requested code.
    for _ in 0..20 {
        env.request_code().execute(EMAIL, &meta()).await.unwrap();
        let code = env.mailer.last_code().unwrap();
        verify.execute(EMAIL, &code, &meta()).await.unwrap();
    }

    env.request_code().execute(EMAIL, &meta()).await.unwrap();
    let code = env.mailer.last_code().unwrap();
    let err = verify.execute(EMAIL, &code, &meta()).await.unwrap_err();

    let AuthServiceError::RateLimitedSoft { retry_after_ms } = err else {
        panic!("expected a rate-limit error");
    };
    assert!(retry_after_ms > 0);
    assert_eq!(env.audit.last_reason().as_deref(), Some("verify-rate-limit"));
}
