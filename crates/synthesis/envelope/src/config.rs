use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Retry and timeout policy for external calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Attempts per route, including the first.
    pub max_attempts: u32,

    /// Delay before the second attempt (milliseconds).
    pub base_delay_ms: u64,

    /// Upper bound on any single delay (milliseconds).
    pub max_delay_ms: u64,

    /// Relative jitter, in [0, 1].
    pub jitter_factor: f64,

    /// Per-attempt timeout (milliseconds).
    pub call_timeout_ms: u64,

    /// How long a quota-exhausted route stays unavailable (milliseconds).
    pub quota_recovery_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 500,
            max_delay_ms: 8000,
            jitter_factor: 0.2,
            call_timeout_ms: 30_000,
            quota_recovery_ms: 60_000,
        }
    }
}

impl RetryConfig {
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    pub fn with_delays(mut self, base_ms: u64, max_ms: u64) -> Self {
        self.base_delay_ms = base_ms;
        self.max_delay_ms = max_ms;
        self
    }

    pub fn with_jitter(mut self, factor: f64) -> Self {
        self.jitter_factor = factor;
        self
    }

    pub fn with_call_timeout_ms(mut self, ms: u64) -> Self {
        self.call_timeout_ms = ms;
        self
    }

    pub fn with_quota_recovery_ms(mut self, ms: u64) -> Self {
        self.quota_recovery_ms = ms;
        self
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }

    /// `clamp(base * 2^(attempt-1) * (1 + jitter_factor * unit), base, max)`
    /// where `unit` is in [-1, 1].
    pub fn compute_delay(&self, attempt: u32, unit_jitter: f64) -> Duration {
        let base = self.base_delay_ms as f64;
        let max = self.max_delay_ms as f64;
        let exponent = attempt.saturating_sub(1).min(30) as i32;
        let unit = unit_jitter.clamp(-1.0, 1.0);
        let raw = base * 2f64.powi(exponent) * (1.0 + self.jitter_factor * unit);
        Duration::from_millis(raw.max(base).min(max).round() as u64)
    }

    /// Backoff before retrying after `attempt`, with uniformly sampled jitter.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let unit = rand::thread_rng().gen_range(-1.0..=1.0);
        self.compute_delay(attempt, unit)
    }
}
