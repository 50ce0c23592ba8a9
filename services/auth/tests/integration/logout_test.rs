use brannboll_auth::domain::types::SessionUser;

use super::helpers::{TestEnv, meta};

const EMAIL: &str = "member@example.se";

async fn sign_in(env: &TestEnv) -> (SessionUser, String) {
    env.request_code().execute(EMAIL, &meta()).await.unwrap();
    let code = env.mailer.last_code().unwrap();
    let output = env.verify_code().execute(EMAIL, &code, &meta()).await.unwrap();
    let user = env
        .read_session()
        .execute(&output.token)
        .await
        .unwrap()
        .expect("fresh session should resolve");
    (user, output.token)
}

#[tokio::test]
async fn session_token_resolves_to_the_user() {
    let env = TestEnv::with_allowlist(&[EMAIL]);
    let (user, _) = sign_in(&env).await;
    assert_eq!(user.email, EMAIL);
}

#[tokio::test]
async fn tampered_token_resolves_to_nobody() {
    let env = TestEnv::with_allowlist(&[EMAIL]);
    let (_, token) = sign_in(&env).await;

    let mut tampered = token;
    tampered.pop();
    assert!(env.read_session().execute(&tampered).await.unwrap().is_none());
    assert!(env.read_session().execute("garbage").await.unwrap().is_none());
}

#[tokio::test]
async fn logout_revokes_the_session_immediately() {
    let env = TestEnv::with_allowlist(&[EMAIL]);
    let (user, token) = sign_in(&env).await;

    env.logout().execute(&user, &meta()).await.unwrap();

    // The token still carries a valid signature but the row is revoked.
    assert!(env.read_session().execute(&token).await.unwrap().is_none());
    let events = env.audit.events.lock().unwrap();
    let last = events.last().unwrap();
    assert_eq!(last.event_type.as_str(), "logout");
    assert_eq!(last.actor_user_id, Some(user.id));
}

#[tokio::test]
async fn logout_is_idempotent() {
    let env = TestEnv::with_allowlist(&[EMAIL]);
    let (user, _) = sign_in(&env).await;

    env.logout().execute(&user, &meta()).await.unwrap();
    let first_revoked_at = env.sessions.sessions.lock().unwrap()[0].revoked_at;

    env.logout().execute(&user, &meta()).await.unwrap();
    assert_eq!(
        env.sessions.sessions.lock().unwrap()[0].revoked_at,
        first_revoked_at
    );
}

#[tokio::test]
async fn expired_session_row_resolves_to_nobody() {
    let env = TestEnv::with_allowlist(&[EMAIL]);
    let (_, token) = sign_in(&env).await;

    {
        let mut sessions = env.sessions.sessions.lock().unwrap();
        sessions[0].expires_at = chrono::Utc::now() - chrono::Duration::seconds(1);
    }

    assert!(env.read_session().execute(&token).await.unwrap().is_none());
}
