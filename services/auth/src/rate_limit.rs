//! Fixed-window rate limiting.
//!
//! Counters live in Redis when configured and fall back to an in-process map
//! when the store errors or is absent. The limiter itself never fails: losing
//! Redis degrades enforcement to per-instance counters instead of taking
//! authentication down with it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::AuthServiceError;

/// One rate-limit rule: at most `limit` calls per fixed `window_ms` window.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitRule {
    pub limit: u64,
    pub window_ms: u64,
}

/// The windows checked by the two flows.
pub mod limits {
    use super::RateLimitRule;

    pub const REQUEST_BY_EMAIL_15M: RateLimitRule = RateLimitRule {
        limit: 5,
        window_ms: 15 * 60 * 1_000,
    };
    pub const REQUEST_BY_EMAIL_DAY: RateLimitRule = RateLimitRule {
        limit: 20,
        window_ms: 24 * 60 * 60 * 1_000,
    };
    pub const REQUEST_BY_EMAIL_IP_15M: RateLimitRule = RateLimitRule {
        limit: 8,
        window_ms: 15 * 60 * 1_000,
    };
    /// Soft ceiling: trips the risk engine, never blocks on its own.
    pub const REQUEST_BY_IP_10M_SOFT: RateLimitRule = RateLimitRule {
        limit: 200,
        window_ms: 10 * 60 * 1_000,
    };
    pub const VERIFY_BY_EMAIL_15M: RateLimitRule = RateLimitRule {
        limit: 20,
        window_ms: 15 * 60 * 1_000,
    };
}

/// A counter observed after an increment.
#[derive(Debug, Clone, Copy)]
pub struct CounterEntry {
    pub count: u64,
    pub reset_at_ms: u64,
}

#[derive(Debug, Clone, Copy)]
pub struct RateLimitResult {
    pub allowed: bool,
    pub count: u64,
    pub limit: u64,
    pub retry_after_ms: u64,
}

/// Port for a distributed atomic window counter.
#[allow(async_fn_in_trait)]
pub trait CounterStore: Send + Sync {
    /// Atomically increment the counter for `key` in the current window.
    async fn incr_window(&self, key: &str, window_ms: u64) -> Result<CounterEntry, AuthServiceError>;
}

pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Fixed-window bucket index: `floor(now / window)`.
pub fn window_bucket(now_ms: u64, window_ms: u64) -> u64 {
    now_ms / window_ms.max(1)
}

/// In-process counters. Constructed once at startup and owned by the limiter;
/// scoped to the process, not a source of truth across instances.
#[derive(Clone, Default)]
pub struct MemoryCounters {
    entries: Arc<Mutex<HashMap<String, CounterEntry>>>,
}

impl MemoryCounters {
    pub fn new() -> Self {
        Self::default()
    }

    fn increment(&self, key: &str, window_ms: u64) -> CounterEntry {
        let now = now_ms();
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let entry = entries
            .entry(key.to_owned())
            .or_insert(CounterEntry { count: 0, reset_at_ms: now + window_ms });
        if entry.reset_at_ms <= now {
            *entry = CounterEntry { count: 0, reset_at_ms: now + window_ms };
        }
        entry.count += 1;
        *entry
    }
}

/// Multi-key fixed-window limiter with a distributed store and an in-process
/// fallback behind one `check` call.
#[derive(Clone)]
pub struct RateLimiter<S: CounterStore> {
    store: Option<S>,
    fallback: MemoryCounters,
}

impl<S: CounterStore> RateLimiter<S> {
    pub fn new(store: Option<S>) -> Self {
        Self {
            store,
            fallback: MemoryCounters::new(),
        }
    }

    /// Limiter without a distributed store; counters are per process.
    pub fn in_process() -> Self {
        Self::new(None)
    }

    /// Count this call against `key`'s current window.
    ///
    /// Total: a store error degrades to the in-process counters for this one
    /// call instead of surfacing to the caller.
    pub async fn check(&self, key: &str, rule: RateLimitRule) -> RateLimitResult {
        let entry = match &self.store {
            Some(store) => match store.incr_window(key, rule.window_ms).await {
                Ok(entry) => entry,
                Err(error) => {
                    tracing::warn!(
                        key,
                        error = %error,
                        "counter store unavailable, using in-process counters"
                    );
                    self.fallback.increment(key, rule.window_ms)
                }
            },
            None => self.fallback.increment(key, rule.window_ms),
        };
        RateLimitResult {
            allowed: entry.count <= rule.limit,
            count: entry.count,
            limit: rule.limit,
            retry_after_ms: entry.reset_at_ms.saturating_sub(now_ms()),
        }
    }
}
