//! Model descriptors, provider dialects, and admin status projections.
//!
//! A `ModelDescriptor` is the load-time-validated configuration for one
//! logical model: which provider dialect to speak, where to send requests,
//! and what generation parameters to use. Descriptors are immutable after
//! load and wholesale-replaced on refresh. Per-dialect settings live in the
//! tagged `ProviderSpec` enum so each variant is a typed struct rather than
//! a free-form map.

use std::collections::HashMap;
use std::fmt;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

/// Generation parameters sent with every completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationParams {
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_temperature() -> f64 {
    0.7
}

fn default_max_tokens() -> u32 {
    1024
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

/// Provider dialect plus its variant-specific settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderSpec {
    /// Generic OpenAI-style chat-completion endpoint.
    ChatCompletion,

    /// Anthropic-style messages API: system prompt as a top-level field.
    Messages,

    /// Chat-completion endpoint whose accepted model ids differ from the
    /// configured one. Unknown ids map to `fallback_model_id`; a
    /// "model not found" provider error triggers exactly one retry with
    /// the fallback id.
    RemapFallback {
        #[serde(default)]
        model_map: HashMap<String, String>,
        fallback_model_id: String,
        /// Send the persona prompt as a synthetic first user turn instead
        /// of the system field.
        #[serde(default)]
        persona_as_user: bool,
    },

    /// Caller-supplied request body template and header map. Headers may
    /// contain an `{api_key}` substitution token.
    Template {
        body: serde_json::Value,
        #[serde(default)]
        headers: HashMap<String, String>,
    },

    /// OpenAI-compatible local server (no credential required).
    LocalServer,
}

impl ProviderSpec {
    /// Short identifier for admin display, matching the config tag.
    pub fn kind(&self) -> &'static str {
        match self {
            ProviderSpec::ChatCompletion => "chat_completion",
            ProviderSpec::Messages => "messages",
            ProviderSpec::RemapFallback { .. } => "remap_fallback",
            ProviderSpec::Template { .. } => "template",
            ProviderSpec::LocalServer => "local_server",
        }
    }
}

impl fmt::Display for ProviderSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind())
    }
}

/// Configuration for one logical model. Immutable after load.
///
/// The API key is wrapped in [`SecretString`] and never serialized or
/// printed; it is only exposed when an adapter builds request headers.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelDescriptor {
    /// Logical name users and admins refer to this model by.
    pub name: String,
    /// Optional human-readable description for admin listings.
    #[serde(default)]
    pub description: Option<String>,
    /// Base URL or full endpoint, depending on the dialect.
    #[serde(default)]
    pub endpoint: Option<String>,
    /// API key, where the dialect requires one.
    #[serde(default)]
    pub api_key: Option<SecretString>,
    /// Provider-side model identifier.
    pub model_id: String,
    #[serde(default)]
    pub params: GenerationParams,
    /// Dot-separated override path for response extraction.
    #[serde(default)]
    pub response_path: Option<String>,
    pub provider: ProviderSpec,
}

/// Read-only health/status projection of a registered model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelStatusInfo {
    pub name: String,
    /// Provider dialect tag (e.g. "chat_completion").
    pub kind: String,
    pub description: Option<String>,
    /// One of "available", "degraded", "cooling".
    pub status: String,
    pub failure_count: u32,
    /// Seconds until the cooldown elapses, when cooling.
    pub available_in_secs: Option<u64>,
    pub last_error: Option<String>,
}
