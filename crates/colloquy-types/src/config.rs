//! Typed settings for the registry and the orchestrator.
//!
//! All fields have sensible defaults so a minimal config file only needs
//! to name its models. Loaded from TOML by the infrastructure crate.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Health and cooldown settings applied to every registered model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrySettings {
    /// Consecutive failures before a model starts cooling.
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,

    /// Base cooldown in seconds; doubles with each failure past the
    /// threshold.
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,

    /// Upper bound on the cooldown window in seconds.
    #[serde(default = "default_cooldown_cap_secs")]
    pub cooldown_cap_secs: u64,
}

fn default_failure_threshold() -> u32 {
    3
}

fn default_cooldown_secs() -> u64 {
    30
}

fn default_cooldown_cap_secs() -> u64 {
    600
}

impl RegistrySettings {
    pub fn base_cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }

    pub fn cooldown_cap(&self) -> Duration {
        Duration::from_secs(self.cooldown_cap_secs)
    }
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            cooldown_secs: default_cooldown_secs(),
            cooldown_cap_secs: default_cooldown_cap_secs(),
        }
    }
}

/// Conversation bookkeeping and worker-pool settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorSettings {
    /// Maximum messages retained per user session.
    #[serde(default = "default_max_history")]
    pub max_history: usize,

    /// Maximum outbound segments per reply; excess segments are dropped
    /// from the tail.
    #[serde(default = "default_max_segments")]
    pub max_segments: usize,

    /// Bound on concurrently executing replies across all users.
    #[serde(default = "default_max_concurrent_replies")]
    pub max_concurrent_replies: usize,
}

fn default_max_history() -> usize {
    40
}

fn default_max_segments() -> usize {
    5
}

fn default_max_concurrent_replies() -> usize {
    32
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            max_history: default_max_history(),
            max_segments: default_max_segments(),
            max_concurrent_replies: default_max_concurrent_replies(),
        }
    }
}
