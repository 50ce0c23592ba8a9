use anyhow::Context;
use deadpool_redis::Pool;
use deadpool_redis::redis::AsyncCommands;

use crate::error::AuthServiceError;
use crate::rate_limit::{CounterEntry, CounterStore, now_ms, window_bucket};

/// Distributed window counters in Redis.
///
/// Key layout: `rl:<key>:<bucket>` where the bucket is the window-aligned
/// index of "now". INCR is atomic across instances; the key expires one
/// second after its window so stale buckets clean themselves up.
#[derive(Clone)]
pub struct RedisCounterStore {
    pool: Pool,
}

impl RedisCounterStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

impl CounterStore for RedisCounterStore {
    async fn incr_window(
        &self,
        key: &str,
        window_ms: u64,
    ) -> Result<CounterEntry, AuthServiceError> {
        let mut conn = self
            .pool
            .get()
            .await
            .context("failed to get redis connection")?;

        let bucket = window_bucket(now_ms(), window_ms);
        let window_key = format!("rl:{key}:{bucket}");

        let count: u64 = conn
            .incr(&window_key, 1)
            .await
            .context("failed to increment window counter")?;
        if count == 1 {
            let () = conn
                .pexpire(&window_key, (window_ms + 1_000) as i64)
                .await
                .context("failed to set counter expiry")?;
        }

        Ok(CounterEntry {
            count,
            reset_at_ms: (bucket + 1) * window_ms,
        })
    }
}
