//! Heuristic risk scoring.
//!
//! A pure, total function from abuse signals to a 0-100 score, an artificial
//! response delay and a hard-block verdict. No I/O; the caller gathers the
//! signals from the rate limiter and the audit trail.

/// Abuse signals for one authentication attempt.
#[derive(Debug, Clone, Copy, Default)]
pub struct RiskSignals {
    /// The per-IP soft ceiling tripped.
    pub ip_soft_limited: bool,
    /// Any per-email rate limit tripped.
    pub email_limited: bool,
    pub email_failures_last_hour: u64,
    pub ip_failures_last_hour: u64,
    pub ua_failures_last_hour: u64,
}

#[derive(Debug, Clone, Copy)]
pub struct RiskDecision {
    pub score: u32,
    /// Deliberate latency before responding; throttles automated retries
    /// without refusing service.
    pub soft_delay_ms: u64,
    /// Outright refusal. Reachable only through combined signals, never a
    /// single spike.
    pub hard_block: bool,
}

/// Scoring weights and thresholds.
///
/// These are operator policy, not correctness invariants; the defaults mirror
/// the tuning the portal has run with. Scoring stays monotonic in every
/// signal for any sane configuration.
#[derive(Debug, Clone, Copy)]
pub struct RiskPolicy {
    pub email_limited_points: u32,
    pub ip_soft_limited_points: u32,
    pub email_failure_points: u64,
    pub email_failure_cap: u64,
    pub ip_failure_points: u64,
    pub ip_failure_cap: u64,
    pub ua_failure_points: u64,
    pub ua_failure_cap: u64,
    /// Score at which the soft delay starts.
    pub soft_delay_threshold: u32,
    pub soft_delay_base_ms: u64,
    /// Additional delay per score point above the threshold.
    pub soft_delay_step_ms: u64,
    pub soft_delay_max_ms: u64,
    pub hard_block_threshold: u32,
}

impl Default for RiskPolicy {
    fn default() -> Self {
        Self {
            email_limited_points: 35,
            ip_soft_limited_points: 45,
            email_failure_points: 5,
            email_failure_cap: 25,
            ip_failure_points: 2,
            ip_failure_cap: 25,
            ua_failure_points: 3,
            ua_failure_cap: 15,
            soft_delay_threshold: 40,
            soft_delay_base_ms: 1_000,
            soft_delay_step_ms: 120,
            soft_delay_max_ms: 8_000,
            hard_block_threshold: 95,
        }
    }
}

impl RiskPolicy {
    pub fn score(&self, signals: &RiskSignals) -> u32 {
        let mut score: u64 = 0;
        if signals.email_limited {
            score += u64::from(self.email_limited_points);
        }
        if signals.ip_soft_limited {
            score += u64::from(self.ip_soft_limited_points);
        }
        score += capped(signals.email_failures_last_hour, self.email_failure_points, self.email_failure_cap);
        score += capped(signals.ip_failures_last_hour, self.ip_failure_points, self.ip_failure_cap);
        score += capped(signals.ua_failures_last_hour, self.ua_failure_points, self.ua_failure_cap);
        score.min(100) as u32
    }

    pub fn decide(&self, signals: &RiskSignals) -> RiskDecision {
        let score = self.score(signals);
        let soft_delay_ms = if score >= self.soft_delay_threshold {
            let over = u64::from(score - self.soft_delay_threshold);
            (self.soft_delay_base_ms + over * self.soft_delay_step_ms).min(self.soft_delay_max_ms)
        } else {
            0
        };
        RiskDecision {
            score,
            soft_delay_ms,
            hard_block: score >= self.hard_block_threshold,
        }
    }
}

fn capped(count: u64, per: u64, cap: u64) -> u64 {
    count.saturating_mul(per).min(cap)
}
