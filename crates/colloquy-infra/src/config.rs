//! TOML configuration loading.
//!
//! One file describes the whole deployment: registry and orchestrator
//! tuning, the model catalog, and the persona catalog. Descriptors are
//! validated at load time so a bad config fails fast instead of at the
//! first user message.

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use colloquy_types::config::{OrchestratorSettings, RegistrySettings};
use colloquy_types::model::ModelDescriptor;
use colloquy_types::persona::PersonaDescriptor;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Full deployment configuration.
#[derive(Debug, Deserialize)]
pub struct BotConfig {
    /// Name of the model used when a user has no preference.
    pub default_model: String,

    #[serde(default)]
    pub registry: RegistrySettings,

    #[serde(default)]
    pub orchestrator: OrchestratorSettings,

    pub models: Vec<ModelDescriptor>,

    #[serde(default)]
    pub personas: Vec<PersonaDescriptor>,
}

impl BotConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_toml_str(&raw)?;
        info!(
            path = %path.display(),
            models = config.models.len(),
            personas = config.personas.len(),
            "Loaded configuration"
        );
        Ok(config)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.models.is_empty() {
            return Err(ConfigError::Invalid("no models configured".to_string()));
        }

        let mut seen = HashSet::new();
        for model in &self.models {
            if !seen.insert(model.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate model name: {}",
                    model.name
                )));
            }
        }
        if !seen.contains(self.default_model.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "default_model '{}' is not in the model catalog",
                self.default_model
            )));
        }

        let mut personas = HashSet::new();
        for persona in &self.personas {
            if !personas.insert(persona.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate persona name: {}",
                    persona.name
                )));
            }
        }

        Ok(())
    }
}
