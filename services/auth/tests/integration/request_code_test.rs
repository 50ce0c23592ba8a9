use brannboll_auth::domain::types::AuthOutcome;
use brannboll_auth::otp::hash_otp;

use super::helpers::{OTP_SECRET, TestEnv, meta};

const EMAIL: &str = "member@example.se";

#[tokio::test]
async fn sends_a_hashed_code_to_an_allowlisted_email() {
    let env = TestEnv::with_allowlist(&[EMAIL]);

    env.request_code().execute(EMAIL, &meta()).await.unwrap();

    let code = env.mailer.last_code().expect("a code should be sent");
    assert_eq!(code.len(), 6);

    let codes = env.otp_codes.codes.lock().unwrap();
    assert_eq!(codes.len(), 1);
    assert_eq!(codes[0].email, EMAIL);
    // Stored hashed, never in plaintext.
    assert_eq!(codes[0].code_hash, hash_otp(EMAIL, &code, OTP_SECRET));
    assert_ne!(codes[0].code_hash, code);
    assert!(codes[0].consumed_at.is_none());

    assert_eq!(env.audit.last_outcome(), Some(AuthOutcome::Success));
}

#[tokio::test]
async fn unknown_email_gets_no_code_but_an_audit_record() {
    let env = TestEnv::with_allowlist(&["someone-else@example.se"]);

    // Succeeds from the caller's point of view.
    env.request_code().execute(EMAIL, &meta()).await.unwrap();

    assert!(env.mailer.sent.lock().unwrap().is_empty());
    assert!(env.otp_codes.codes.lock().unwrap().is_empty());
    assert_eq!(env.audit.last_outcome(), Some(AuthOutcome::Failure));
    assert_eq!(env.audit.last_reason().as_deref(), Some("email-not-allowlisted"));
}

#[tokio::test]
async fn reissuing_consumes_the_previous_code() {
    let env = TestEnv::with_allowlist(&[EMAIL]);
    let usecase = env.request_code();

    usecase.execute(EMAIL, &meta()).await.unwrap();
    usecase.execute(EMAIL, &meta()).await.unwrap();

    let codes = env.otp_codes.codes.lock().unwrap();
    assert_eq!(codes.len(), 2);
    let live: Vec<_> = codes.iter().filter(|c| c.consumed_at.is_none()).collect();
    assert_eq!(live.len(), 1, "only the newest code may be live");
    assert_eq!(live[0].code_hash, codes[1].code_hash);
}

#[tokio::test(start_paused = true)]
async fn sixth_request_in_the_window_is_suppressed() {
    let env = TestEnv::with_allowlist(&[EMAIL]);
    let usecase = env.request_code();

    for _ in 0..6 {
        usecase.execute(EMAIL, &meta()).await.unwrap();
    }

    // Five went out; the sixth was silently dropped.
    assert_eq!(env.mailer.sent.lock().unwrap().len(), 5);
    assert_eq!(env.audit.last_outcome(), Some(AuthOutcome::Blocked));
    assert_eq!(env.audit.last_reason().as_deref(), Some("email-rate-limited"));
}

#[tokio::test(start_paused = true)]
async fn heavy_failure_history_plus_rate_limit_hard_blocks() {
    let env = TestEnv::with_allowlist(&[EMAIL]);

    // Fifteen genuine failure rows on the same email, IP and user agent:
    // three issued codes, five wrong guesses each. Every guess lands while
    // the code still has attempt budget, so each one records a failure.
    let verify = env.verify_code();
    for _ in 0..3 {
        env.request_code().execute(EMAIL, &meta()).await.unwrap();
        for _ in 0..5 {
            let _ = verify.execute(EMAIL, "000000", &meta()).await;
        }
    }

    // Exhaust the per-email window, then one more. The tripped email limit
    // on top of the failure history crosses the hard-block threshold.
    let usecase = env.request_code();
    for _ in 0..5 {
        usecase.execute(EMAIL, &meta()).await.unwrap();
    }
    let sent_before = env.mailer.sent.lock().unwrap().len();

    usecase.execute(EMAIL, &meta()).await.unwrap();

    assert_eq!(env.mailer.sent.lock().unwrap().len(), sent_before);
    assert_eq!(env.audit.last_outcome(), Some(AuthOutcome::Blocked));
    assert_eq!(env.audit.last_reason().as_deref(), Some("risk-hard-block"));
}

#[tokio::test(start_paused = true)]
async fn blocked_attempts_do_not_feed_the_risk_score() {
    let env = TestEnv::with_allowlist(&[EMAIL]);
    let usecase = env.request_code();

    // Exhaust the window, then keep hammering. Each extra call writes a
    // blocked audit row; none of them may count as a failure, so the score
    // stays at the email-limit contribution and never escalates to a
    // hard block.
    for _ in 0..5 {
        usecase.execute(EMAIL, &meta()).await.unwrap();
    }
    for _ in 0..20 {
        usecase.execute(EMAIL, &meta()).await.unwrap();
        assert_eq!(env.audit.last_reason().as_deref(), Some("email-rate-limited"));
    }

    let events = env.audit.events.lock().unwrap();
    assert!(events.iter().all(|e| e.risk_score < 95));
}
