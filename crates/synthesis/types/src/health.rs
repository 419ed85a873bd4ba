use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Health of one external call route.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProviderHealth {
    pub route: String,
    pub consecutive_failures: u32,
    pub quota_exhausted: bool,
    /// When a quota flag clears on its own.
    pub quota_clears_at: Option<DateTime<Utc>>,
    /// Last classified error (e.g. `rate_limit`).
    pub last_error_code: Option<String>,
    pub last_failure_at: Option<DateTime<Utc>>,
    pub last_success_at: Option<DateTime<Utc>>,
}

impl ProviderHealth {
    pub fn new(route: impl Into<String>) -> Self {
        Self {
            route: route.into(),
            consecutive_failures: 0,
            quota_exhausted: false,
            quota_clears_at: None,
            last_error_code: None,
            last_failure_at: None,
            last_success_at: None,
        }
    }

    /// Any success resets the route to healthy.
    pub fn record_success(&mut self, at: DateTime<Utc>) {
        self.consecutive_failures = 0;
        self.quota_exhausted = false;
        self.quota_clears_at = None;
        self.last_success_at = Some(at);
    }

    pub fn record_failure(&mut self, code: impl Into<String>, at: DateTime<Utc>) {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.last_error_code = Some(code.into());
        self.last_failure_at = Some(at);
    }

    pub fn mark_quota_exhausted(&mut self, at: DateTime<Utc>, recovery: Duration) {
        self.quota_exhausted = true;
        self.quota_clears_at = Some(at + recovery);
    }

    /// Usable at `now`? An expired quota flag is cleared as a side effect.
    pub fn is_available(&mut self, now: DateTime<Utc>) -> bool {
        if self.quota_exhausted {
            match self.quota_clears_at {
                Some(clears) if now >= clears => {
                    self.quota_exhausted = false;
                    self.quota_clears_at = None;
                }
                _ => return false,
            }
        }
        true
    }
}
