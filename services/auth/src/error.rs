use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Auth service error variants.
///
/// The request-code handler never surfaces these to the client (it always
/// answers with the same generic message); verify-code and logout map them to
/// structured error bodies.
#[derive(Debug, thiserror::Error)]
pub enum AuthServiceError {
    #[error("invalid email or code")]
    InvalidInput,
    #[error("too many attempts, wait a moment and retry")]
    RateLimitedSoft { retry_after_ms: u64 },
    #[error("email address is not allowed")]
    NotAllowedEmail,
    #[error("invalid code")]
    InvalidCode,
    #[error("code has expired, request a new one")]
    CodeExpired,
    #[error("authentication required")]
    Unauthorized,
    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl AuthServiceError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput => "INVALID_INPUT",
            Self::RateLimitedSoft { .. } => "RATE_LIMITED_SOFT",
            Self::NotAllowedEmail => "NOT_ALLOWED_EMAIL",
            Self::InvalidCode => "INVALID_CODE",
            Self::CodeExpired => "CODE_EXPIRED",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Internal(_) => "INTERNAL",
        }
    }
}

impl IntoResponse for AuthServiceError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::InvalidInput | Self::InvalidCode | Self::CodeExpired => StatusCode::BAD_REQUEST,
            Self::RateLimitedSoft { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::NotAllowedEmail => StatusCode::FORBIDDEN,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        // Log 500s only. tower-http TraceLayer already records method/uri/status
        // for every request. 4xx are expected client outcomes; internal errors
        // need the anyhow chain logged so the root cause is traceable.
        if let Self::Internal(ref e) = self {
            tracing::error!(error = %e, kind = "INTERNAL", "internal error");
        }
        let mut error = serde_json::json!({
            "kind": self.kind(),
            "message": self.to_string(),
        });
        if let Self::RateLimitedSoft { retry_after_ms } = &self {
            error["retry_after_ms"] = serde_json::json!(retry_after_ms);
        }
        let body = serde_json::json!({ "error": error });
        (status, axum::Json(body)).into_response()
    }
}
