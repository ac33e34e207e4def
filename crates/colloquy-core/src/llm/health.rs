//! Per-model health tracking.
//!
//! State machine per registered model:
//! `Available -> (failure) -> Degraded(n) -> (n >= threshold) ->
//! Cooling(until) -> (elapsed) -> Available`.
//!
//! Health biases model selection but never blocks a reply attempt
//! outright -- the registry fails open when nothing is available.

use std::time::{Duration, Instant};

use colloquy_types::config::RegistrySettings;
use colloquy_types::model::ModelStatusInfo;

/// Cooling state for a model, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CoolingState {
    /// Usable. Degradation is expressed by the failure counter.
    Idle,
    /// Deprioritized until the deadline passes.
    Cooling { until: Instant },
}

/// Health record for a single model. Guarded by a per-entry lock in the
/// registry; independent models never serialize against each other.
#[derive(Debug, Clone)]
pub struct ModelHealth {
    state: CoolingState,
    consecutive_failures: u32,
    last_error: Option<String>,
    failure_threshold: u32,
    base_cooldown: Duration,
    cooldown_cap: Duration,
}

impl ModelHealth {
    pub fn new(settings: &RegistrySettings) -> Self {
        Self {
            state: CoolingState::Idle,
            consecutive_failures: 0,
            last_error: None,
            failure_threshold: settings.failure_threshold,
            base_cooldown: settings.base_cooldown(),
            cooldown_cap: settings.cooldown_cap(),
        }
    }

    /// Whether this model should be offered for routing. A cooldown whose
    /// deadline has passed transitions back to Available.
    pub fn is_available(&mut self) -> bool {
        match self.state {
            CoolingState::Idle => true,
            CoolingState::Cooling { until } => {
                if Instant::now() >= until {
                    self.state = CoolingState::Idle;
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Record a failed call. Past the threshold the model starts cooling;
    /// the window doubles with each further failure, capped.
    pub fn record_failure(&mut self, error: impl Into<String>) {
        self.consecutive_failures += 1;
        self.last_error = Some(error.into());

        if self.consecutive_failures >= self.failure_threshold {
            let exponent = self.consecutive_failures - self.failure_threshold;
            let cooldown = self
                .base_cooldown
                .saturating_mul(1u32 << exponent.min(16))
                .min(self.cooldown_cap);
            self.state = CoolingState::Cooling {
                until: Instant::now() + cooldown,
            };
        }
    }

    /// Record a successful call: clears the failure count and any cooldown.
    pub fn record_success(&mut self) {
        self.consecutive_failures = 0;
        self.last_error = None;
        self.state = CoolingState::Idle;
    }

    /// Unconditionally clear failures and cooldown (admin reset).
    pub fn reset(&mut self) {
        self.record_success();
    }

    pub fn failure_count(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Remaining cooldown, if cooling and not yet elapsed.
    pub fn cooldown_remaining(&self) -> Option<Duration> {
        match self.state {
            CoolingState::Cooling { until } => {
                let now = Instant::now();
                (until > now).then(|| until - now)
            }
            CoolingState::Idle => None,
        }
    }

    /// Status projection for admin display. Does not mutate state, so a
    /// cooldown that elapsed but has not been probed still reads as
    /// "available".
    pub fn status_info(&self, name: &str, kind: &str, description: Option<&str>) -> ModelStatusInfo {
        let remaining = self.cooldown_remaining();
        let status = if remaining.is_some() {
            "cooling"
        } else if self.consecutive_failures > 0 {
            "degraded"
        } else {
            "available"
        };

        ModelStatusInfo {
            name: name.to_string(),
            kind: kind.to_string(),
            description: description.map(str::to_string),
            status: status.to_string(),
            failure_count: self.consecutive_failures,
            available_in_secs: remaining.map(|d| d.as_secs()),
            last_error: self.last_error.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> RegistrySettings {
        RegistrySettings {
            failure_threshold: 3,
            cooldown_secs: 30,
            cooldown_cap_secs: 600,
        }
    }

    #[test]
    fn test_new_health_is_available() {
        let mut health = ModelHealth::new(&settings());
        assert!(health.is_available());
        assert_eq!(health.failure_count(), 0);
    }

    #[test]
    fn test_cooling_opens_at_threshold() {
        let mut health = ModelHealth::new(&settings());
        health.record_failure("timeout");
        health.record_failure("timeout");
        assert!(health.is_available()); // 2 failures, threshold is 3

        health.record_failure("timeout");
        assert!(!health.is_available());
        assert!(health.cooldown_remaining().is_some());
    }

    #[test]
    fn test_success_clears_failures_and_cooldown() {
        let mut health = ModelHealth::new(&settings());
        for _ in 0..4 {
            health.record_failure("boom");
        }
        assert!(!health.is_available());

        health.record_success();
        assert!(health.is_available());
        assert_eq!(health.failure_count(), 0);
        assert!(health.last_error().is_none());
    }

    #[test]
    fn test_reset_clears_unconditionally() {
        let mut health = ModelHealth::new(&settings());
        for _ in 0..5 {
            health.record_failure("boom");
        }
        health.reset();
        assert!(health.is_available());
        assert_eq!(health.failure_count(), 0);
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let mut health = ModelHealth::new(&settings());
        for _ in 0..3 {
            health.record_failure("boom");
        }
        let first = health.cooldown_remaining().unwrap();
        assert!(first <= Duration::from_secs(30));

        health.record_failure("boom");
        let second = health.cooldown_remaining().unwrap();
        assert!(second > first);
        assert!(second <= Duration::from_secs(60));

        // Pile on failures: the window must never exceed the cap.
        for _ in 0..20 {
            health.record_failure("boom");
        }
        assert!(health.cooldown_remaining().unwrap() <= Duration::from_secs(600));
    }

    #[test]
    fn test_elapsed_cooldown_becomes_available() {
        let fast = RegistrySettings {
            failure_threshold: 1,
            cooldown_secs: 0,
            cooldown_cap_secs: 0,
        };
        let mut health = ModelHealth::new(&fast);
        health.record_failure("boom");
        // Zero-length cooldown elapses immediately.
        assert!(health.is_available());
    }

    #[test]
    fn test_status_info_labels() {
        let mut health = ModelHealth::new(&settings());
        assert_eq!(health.status_info("m", "messages", None).status, "available");

        health.record_failure("boom");
        let info = health.status_info("m", "messages", Some("desc"));
        assert_eq!(info.status, "degraded");
        assert_eq!(info.failure_count, 1);
        assert_eq!(info.last_error.as_deref(), Some("boom"));

        health.record_failure("boom");
        health.record_failure("boom");
        let info = health.status_info("m", "messages", None);
        assert_eq!(info.status, "cooling");
        assert!(info.available_in_secs.is_some());
    }
}
