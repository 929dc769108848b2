//! Per-provider health tracking.
//!
//! Counts consecutive failures per provider. A provider whose count reaches
//! the threshold is skipped when the manager picks a working provider, until
//! a completed call or a manual reset brings the count back to zero.
//!
//! Health is in-memory and resets on restart.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use log::{debug, info, warn};

/// Default number of consecutive failures before a provider is skipped.
pub const DEFAULT_MAX_FAILURES: u32 = 3;

/// Thread-safe consecutive-failure counters keyed by provider name.
pub struct ProviderHealth {
    failures: Mutex<HashMap<String, u32>>,
    max_failures: u32,
}

impl ProviderHealth {
    pub fn new(max_failures: u32) -> Self {
        Self {
            failures: Mutex::new(HashMap::new()),
            max_failures,
        }
    }

    /// Lock the counters, recovering from poison if necessary.
    fn lock_failures(&self) -> MutexGuard<'_, HashMap<String, u32>> {
        self.failures.lock().unwrap_or_else(|poisoned| {
            warn!("Provider health mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Record a completed call; the failure count goes back to zero.
    pub fn record_success(&self, provider: &str) {
        let mut failures = self.lock_failures();
        if let Some(count) = failures.get_mut(provider) {
            if *count > 0 {
                debug!("Provider '{}' succeeded, failure count reset", provider);
            }
            *count = 0;
        }
    }

    /// Record a failed call.
    pub fn record_failure(&self, provider: &str) {
        let mut failures = self.lock_failures();
        let count = failures.entry(provider.to_string()).or_insert(0);
        *count += 1;

        if *count == self.max_failures {
            warn!(
                "Provider '{}' reached {} consecutive failures, skipping it until it recovers",
                provider, count
            );
        } else {
            debug!(
                "Provider '{}' failure ({}/{})",
                provider, count, self.max_failures
            );
        }
    }

    pub fn failure_count(&self, provider: &str) -> u32 {
        self.lock_failures().get(provider).copied().unwrap_or(0)
    }

    /// Whether the provider is still under the failure threshold.
    pub fn is_healthy(&self, provider: &str) -> bool {
        self.failure_count(provider) < self.max_failures
    }

    /// Zero the failure count for one provider.
    pub fn reset(&self, provider: &str) {
        let mut failures = self.lock_failures();
        if let Some(count) = failures.get_mut(provider) {
            info!("Manually resetting failure count for '{}'", provider);
            *count = 0;
        }
    }
}

impl Default for ProviderHealth {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FAILURES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_provider_is_healthy() {
        let health = ProviderHealth::default();
        assert_eq!(health.failure_count("YAHOO"), 0);
        assert!(health.is_healthy("YAHOO"));
    }

    #[test]
    fn test_threshold_marks_unhealthy() {
        let health = ProviderHealth::new(3);

        health.record_failure("YAHOO");
        health.record_failure("YAHOO");
        assert!(health.is_healthy("YAHOO"));

        health.record_failure("YAHOO");
        assert_eq!(health.failure_count("YAHOO"), 3);
        assert!(!health.is_healthy("YAHOO"));
    }

    #[test]
    fn test_success_resets_count() {
        let health = ProviderHealth::new(3);

        health.record_failure("BROKER");
        health.record_failure("BROKER");
        health.record_success("BROKER");

        assert_eq!(health.failure_count("BROKER"), 0);
    }

    #[test]
    fn test_counts_are_per_provider() {
        let health = ProviderHealth::new(2);

        health.record_failure("BROKER");
        health.record_failure("BROKER");

        assert!(!health.is_healthy("BROKER"));
        assert!(health.is_healthy("YAHOO"));
    }

    #[test]
    fn test_manual_reset() {
        let health = ProviderHealth::new(1);

        health.record_failure("BROKER");
        health.record_failure("YAHOO");
        health.reset("BROKER");
        assert!(health.is_healthy("BROKER"));
        assert!(!health.is_healthy("YAHOO"));
    }
}
