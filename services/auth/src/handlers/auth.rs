//! HTTP handlers for the auth endpoints.
//!
//! `request-code` parses its own body and answers the same generic 200 no
//! matter what happened; the other endpoints use the structured error shape
//! from [`AuthServiceError`].

use axum::Json;
use axum::extract::State;
use axum::http::HeaderMap;
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use serde_json::{Value, json};

use brannboll_auth_types::cookie::{SESSION_COOKIE, clear_session_cookie, set_session_cookie};

use crate::domain::types::{AuthUser, SessionUser};
use crate::error::AuthServiceError;
use crate::request_meta::RequestMeta;
use crate::state::AppState;
use crate::usecase::logout::LogoutUseCase;
use crate::usecase::request_code::RequestCodeUseCase;
use crate::usecase::session::ReadSessionUseCase;
use crate::usecase::verify_code::VerifyCodeUseCase;
use crate::validation::{is_valid_code_shape, parse_email};

/// The only thing `request-code` ever says.
const GENERIC_REQUEST_MESSAGE: &str =
    "If the address is registered, a login code is on its way.";

#[derive(Deserialize)]
struct RequestCodeBody {
    email: String,
}

#[derive(Deserialize)]
struct VerifyCodeBody {
    email: String,
    code: String,
}

fn generic_request_response() -> Json<Value> {
    Json(json!({ "data": { "message": GENERIC_REQUEST_MESSAGE } }))
}

fn user_payload(id: uuid::Uuid, email: &str, name: &Option<String>, role: impl serde::Serialize) -> Value {
    json!({ "id": id, "email": email, "name": name, "role": role })
}

/// `POST /auth/request-code`.
///
/// Always 200 with the same body. The body is parsed by hand so even a
/// malformed request gets the generic answer instead of a distinguishable
/// 400, and use case failures are logged rather than surfaced.
pub async fn request_code(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Json<Value> {
    let Some(email) = serde_json::from_str::<RequestCodeBody>(&body)
        .ok()
        .and_then(|b| parse_email(&b.email))
    else {
        return generic_request_response();
    };

    let meta = RequestMeta::from_headers(&headers, &state.audit_hash_salt);
    let usecase = RequestCodeUseCase::new(
        state.allowlist(),
        state.otp_codes(),
        state.audit(),
        state.mailer.clone(),
        state.limiter.clone(),
        state.risk_policy,
        state.otp_hash_secret.clone(),
    );

    if let Err(error) = usecase.execute(&email, &meta).await {
        tracing::error!(error = %error, "request-code flow failed");
    }
    generic_request_response()
}

/// `POST /auth/verify-code`. On success sets the session cookie and returns
/// the signed-in user.
pub async fn verify_code(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
    body: String,
) -> Result<(CookieJar, Json<Value>), AuthServiceError> {
    let body: VerifyCodeBody =
        serde_json::from_str(&body).map_err(|_| AuthServiceError::InvalidInput)?;
    let email = parse_email(&body.email).ok_or(AuthServiceError::InvalidInput)?;
    let code = body.code.trim();
    if !is_valid_code_shape(code) {
        return Err(AuthServiceError::InvalidInput);
    }

    let meta = RequestMeta::from_headers(&headers, &state.audit_hash_salt);
    let usecase = VerifyCodeUseCase::new(
        state.allowlist(),
        state.otp_codes(),
        state.users(),
        state.sessions(),
        state.audit(),
        state.limiter.clone(),
        state.risk_policy,
        state.otp_hash_secret.clone(),
        state.session_secret.clone(),
    );

    let output = usecase.execute(&email, code, &meta).await?;
    let AuthUser { id, email, name, role } = output.user;

    let jar = set_session_cookie(jar, output.token);
    Ok((
        jar,
        Json(json!({ "data": { "user": user_payload(id, &email, &name, role) } })),
    ))
}

/// `POST /auth/logout`. Requires a valid session; revokes it and clears the
/// cookie.
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
) -> Result<(CookieJar, Json<Value>), AuthServiceError> {
    let user = require_session_user(&state, &jar).await?;
    let meta = RequestMeta::from_headers(&headers, &state.audit_hash_salt);

    LogoutUseCase::new(state.sessions(), state.audit())
        .execute(&user, &meta)
        .await?;

    Ok((
        clear_session_cookie(jar),
        Json(json!({ "data": { "ok": true } })),
    ))
}

/// `GET /auth/me`. Resolves the session cookie to the current user.
pub async fn me(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Json<Value>, AuthServiceError> {
    let user = require_session_user(&state, &jar).await?;
    let SessionUser { id, email, name, role, .. } = user;
    Ok(Json(
        json!({ "data": { "user": user_payload(id, &email, &name, role) } }),
    ))
}

async fn require_session_user(
    state: &AppState,
    jar: &CookieJar,
) -> Result<SessionUser, AuthServiceError> {
    let token = jar
        .get(SESSION_COOKIE)
        .map(|c| c.value().to_owned())
        .ok_or(AuthServiceError::Unauthorized)?;
    ReadSessionUseCase::new(state.sessions(), state.users(), state.session_secret.clone())
        .execute(&token)
        .await?
        .ok_or(AuthServiceError::Unauthorized)
}
