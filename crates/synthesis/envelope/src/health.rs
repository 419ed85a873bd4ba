use crate::classify::ErrorClass;
use chrono::{Duration, Utc};
use dashmap::DashMap;
use synthesis_types::ProviderHealth;
use tracing::warn;

/// Health of every route one envelope has called.
///
/// Entries are created on first use; a route never seen is available.
#[derive(Debug)]
pub struct ProviderHealthRegistry {
    routes: DashMap<String, ProviderHealth>,
    quota_recovery: Duration,
}

impl ProviderHealthRegistry {
    pub fn new(quota_recovery_ms: u64) -> Self {
        Self {
            routes: DashMap::new(),
            quota_recovery: Duration::milliseconds(quota_recovery_ms.min(i64::MAX as u64) as i64),
        }
    }

    pub fn record_success(&self, route: &str) {
        self.routes
            .entry(route.to_string())
            .or_insert_with(|| ProviderHealth::new(route))
            .record_success(Utc::now());
    }

    pub fn record_failure(&self, route: &str, class: ErrorClass) {
        self.routes
            .entry(route.to_string())
            .or_insert_with(|| ProviderHealth::new(route))
            .record_failure(class.as_str(), Utc::now());
    }

    /// Flag `route` unavailable until the quota recovery window passes.
    pub fn mark_quota_exhausted(&self, route: &str) {
        let mut entry = self
            .routes
            .entry(route.to_string())
            .or_insert_with(|| ProviderHealth::new(route));
        entry.mark_quota_exhausted(Utc::now(), self.quota_recovery);
        warn!(
            route = route,
            recovery_ms = self.quota_recovery.num_milliseconds(),
            "route marked quota-exhausted"
        );
    }

    /// Usable now? Clears an expired quota flag.
    pub fn is_available(&self, route: &str) -> bool {
        match self.routes.get_mut(route) {
            Some(mut health) => health.is_available(Utc::now()),
            None => true,
        }
    }

    pub fn get(&self, route: &str) -> Option<ProviderHealth> {
        self.routes.get(route).map(|h| h.clone())
    }

    /// All routes, sorted by name.
    pub fn snapshot(&self) -> Vec<ProviderHealth> {
        let mut all: Vec<ProviderHealth> = self.routes.iter().map(|e| e.value().clone()).collect();
        all.sort_by(|a, b| a.route.cmp(&b.route));
        all
    }
}

impl Default for ProviderHealthRegistry {
    fn default() -> Self {
        Self::new(60_000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_route_is_available() {
        let registry = ProviderHealthRegistry::default();
        assert!(registry.is_available("primary"));
        assert!(registry.get("primary").is_none());
    }

    #[test]
    fn failures_accumulate_until_success() {
        let registry = ProviderHealthRegistry::default();
        registry.record_failure("primary", ErrorClass::ServerError);
        registry.record_failure("primary", ErrorClass::Timeout);
        let h = registry.get("primary").unwrap();
        assert_eq!(h.consecutive_failures, 2);
        assert_eq!(h.last_error_code.as_deref(), Some("timeout"));

        registry.record_success("primary");
        assert_eq!(registry.get("primary").unwrap().consecutive_failures, 0);
    }

    #[test]
    fn quota_flag_blocks_until_recovery() {
        let registry = ProviderHealthRegistry::new(60_000);
        registry.mark_quota_exhausted("primary");
        assert!(!registry.is_available("primary"));
        assert!(registry.is_available("secondary"));
    }

    #[test]
    fn zero_recovery_clears_immediately() {
        let registry = ProviderHealthRegistry::new(0);
        registry.mark_quota_exhausted("primary");
        assert!(registry.is_available("primary"));
        assert!(!registry.get("primary").unwrap().quota_exhausted);
    }

    #[test]
    fn snapshot_is_sorted() {
        let registry = ProviderHealthRegistry::default();
        registry.record_success("b");
        registry.record_success("a");
        let routes: Vec<_> = registry.snapshot().into_iter().map(|h| h.route).collect();
        assert_eq!(routes, vec!["a".to_string(), "b".to_string()]);
    }
}
