use axum::http::StatusCode;

/// Liveness probe handler for `GET /healthz`.
pub async fn healthz() -> StatusCode {
    StatusCode::OK
}

/// Readiness probe handler for `GET /readyz`.
pub async fn readyz() -> StatusCode {
    StatusCode::OK
}
