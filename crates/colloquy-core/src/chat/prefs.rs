//! User preference port: saved model and persona choices.
//!
//! Persistence lives outside this core (an external store owns it); the
//! orchestrator consumes this trait only. `InMemoryPreferences` backs
//! tests and embedders that need no durability.

use dashmap::DashMap;
use std::sync::{PoisonError, RwLock};

/// Saved per-user choices plus the configured default model.
///
/// Uses native async fn in traits (RPITIT, Rust 2024 edition).
pub trait UserPreferences: Send + Sync {
    fn user_model(
        &self,
        user_id: &str,
    ) -> impl std::future::Future<Output = Option<String>> + Send;

    fn set_user_model(
        &self,
        user_id: &str,
        model: &str,
    ) -> impl std::future::Future<Output = ()> + Send;

    fn user_persona(
        &self,
        user_id: &str,
    ) -> impl std::future::Future<Output = Option<String>> + Send;

    fn set_user_persona(
        &self,
        user_id: &str,
        persona: &str,
    ) -> impl std::future::Future<Output = ()> + Send;

    /// The deployment-wide default model, if one is configured here.
    fn default_model(&self) -> impl std::future::Future<Output = Option<String>> + Send;
}

/// Non-durable preference store.
#[derive(Default)]
pub struct InMemoryPreferences {
    models: DashMap<String, String>,
    personas: DashMap<String, String>,
    default_model: RwLock<Option<String>>,
}

impl InMemoryPreferences {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default_model(default: impl Into<String>) -> Self {
        let prefs = Self::default();
        *prefs
            .default_model
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(default.into());
        prefs
    }
}

impl UserPreferences for InMemoryPreferences {
    async fn user_model(&self, user_id: &str) -> Option<String> {
        self.models.get(user_id).map(|v| v.clone())
    }

    async fn set_user_model(&self, user_id: &str, model: &str) {
        self.models.insert(user_id.to_string(), model.to_string());
    }

    async fn user_persona(&self, user_id: &str) -> Option<String> {
        self.personas.get(user_id).map(|v| v.clone())
    }

    async fn set_user_persona(&self, user_id: &str, persona: &str) {
        self.personas
            .insert(user_id.to_string(), persona.to_string());
    }

    async fn default_model(&self) -> Option<String> {
        self.default_model
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
