use axum::Router;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

use brannboll_core::health::{healthz, readyz};
use brannboll_core::middleware::request_id_layer;

use crate::handlers::auth;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/auth/request-code", post(auth::request_code))
        .route("/auth/verify-code", post(auth::verify_code))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/me", get(auth::me))
        .layer(TraceLayer::new_for_http())
        .layer(request_id_layer())
        .with_state(state)
}
