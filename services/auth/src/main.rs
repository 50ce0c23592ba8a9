use brannboll_auth::config::AuthConfig;
use brannboll_auth::infra::email::{ResendCredentials, ResendMailer};
use brannboll_auth::infra::redis::RedisCounterStore;
use brannboll_auth::rate_limit::RateLimiter;
use brannboll_auth::router::build_router;
use brannboll_auth::state::AppState;

#[tokio::main]
async fn main() {
    brannboll_core::tracing::init_tracing();

    let config = AuthConfig::from_env();

    let db = sea_orm::Database::connect(&config.database_url)
        .await
        .expect("failed to connect to postgres");

    let counters = match &config.redis_url {
        Some(url) => {
            let pool = deadpool_redis::Config::from_url(url)
                .create_pool(Some(deadpool_redis::Runtime::Tokio1))
                .expect("failed to create redis pool");
            Some(RedisCounterStore::new(pool))
        }
        None => {
            tracing::warn!("REDIS_URL not set, rate limiting is per instance");
            None
        }
    };

    let credentials = match (&config.resend_api_key, &config.resend_from_email) {
        (Some(api_key), Some(from)) => Some(ResendCredentials {
            api_key: api_key.clone(),
            from: from.clone(),
        }),
        _ => {
            tracing::warn!("mail credentials not set, login codes will be logged");
            None
        }
    };

    let state = AppState::new(
        db,
        RateLimiter::new(counters),
        ResendMailer::new(credentials),
        config.session_secret,
        config.otp_hash_secret,
        config.audit_hash_salt,
    );

    let addr = format!("0.0.0.0:{}", config.auth_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind listener");

    tracing::info!(%addr, "auth service listening");

    axum::serve(listener, build_router(state))
        .await
        .expect("server error");
}
