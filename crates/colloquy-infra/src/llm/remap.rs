//! Chat-completion adapter for backends whose accepted model ids differ
//! from the configured one.
//!
//! The configured id is remapped through `model_map`, falling back to
//! `fallback_model_id` for unknown ids. If the provider still rejects the
//! remapped id with a "model not found" error, the call is retried exactly
//! once with the fallback id and an otherwise identical request. Some of
//! these backends also refuse a system role, so the persona can travel as
//! a synthetic first user turn instead.

use std::collections::HashMap;

use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};
use tracing::warn;

use colloquy_core::llm::adapter::{ChatAdapter, PromptRequest};
use colloquy_core::llm::normalize::{self, ResponseHint};
use colloquy_types::error::AdapterError;
use colloquy_types::model::{GenerationParams, ModelDescriptor, ProviderSpec};

use super::http;

// No Debug derive: holds a credential.
pub struct RemapAdapter {
    client: reqwest::Client,
    url: String,
    api_key: SecretString,
    model_id: String,
    model_map: HashMap<String, String>,
    fallback_model_id: String,
    persona_as_user: bool,
    params: GenerationParams,
    response_path: Option<String>,
}

impl RemapAdapter {
    pub fn from_descriptor(
        client: reqwest::Client,
        descriptor: &ModelDescriptor,
    ) -> Result<Self, AdapterError> {
        let ProviderSpec::RemapFallback {
            model_map,
            fallback_model_id,
            persona_as_user,
        } = &descriptor.provider
        else {
            return Err(AdapterError::Configuration(
                "descriptor is not a remap_fallback provider".to_string(),
            ));
        };
        let endpoint = descriptor
            .endpoint
            .as_deref()
            .ok_or_else(|| AdapterError::Configuration("endpoint is not configured".to_string()))?;
        let api_key = descriptor
            .api_key
            .clone()
            .ok_or_else(|| AdapterError::Configuration("api key is not configured".to_string()))?;

        Ok(Self {
            client,
            url: http::completions_url(endpoint),
            api_key,
            model_id: descriptor.model_id.clone(),
            model_map: model_map.clone(),
            fallback_model_id: fallback_model_id.clone(),
            persona_as_user: *persona_as_user,
            params: descriptor.params.clone(),
            response_path: descriptor.response_path.clone(),
        })
    }

    fn remapped_id(&self) -> String {
        self.model_map
            .get(&self.model_id)
            .cloned()
            .unwrap_or_else(|| self.fallback_model_id.clone())
    }

    fn wire_messages(&self, request: &PromptRequest) -> Vec<Value> {
        if self.persona_as_user {
            let mut out = Vec::with_capacity(request.messages.len() + 1);
            out.push(json!({ "role": "user", "content": request.system }));
            out.extend(http::history_values(&request.messages));
            out
        } else {
            http::messages_with_system(&request.system, &request.messages)
        }
    }

    async fn attempt(&self, model_id: &str, request: &PromptRequest) -> Result<String, AdapterError> {
        let body = json!({
            "model": model_id,
            "messages": self.wire_messages(request),
            "temperature": self.params.temperature,
            "max_tokens": self.params.max_tokens,
        });
        let headers = [(
            "authorization".to_string(),
            format!("Bearer {}", self.api_key.expose_secret()),
        )];

        let (status, raw) = http::post_json(&self.client, &self.url, &headers, &body).await?;
        if !(200..300).contains(&status) {
            return Err(http::provider_error(status, &raw));
        }

        normalize::parse(&raw, ResponseHint::ChatCompletion, self.response_path.as_deref())
            .map_err(AdapterError::from)
    }
}

impl ChatAdapter for RemapAdapter {
    fn kind(&self) -> &'static str {
        "remap_fallback"
    }

    async fn call(&self, request: &PromptRequest) -> Result<String, AdapterError> {
        let mapped = self.remapped_id();
        let result = match self.attempt(&mapped, request).await {
            Err(err) if mapped != self.fallback_model_id && is_model_not_found(&err) => {
                warn!(
                    rejected = %mapped,
                    fallback = %self.fallback_model_id,
                    "Provider rejected model id, retrying once with fallback"
                );
                self.attempt(&self.fallback_model_id, request).await
            }
            other => other,
        };
        result.map_err(refine_status)
    }
}

/// Give the statuses these backends commonly return distinct, actionable
/// messages instead of the provider's raw text. Runs after the retry
/// decision, which matches on the raw 400 message.
fn refine_status(err: AdapterError) -> AdapterError {
    let AdapterError::Provider { status, message } = err else {
        return err;
    };
    let message = match status {
        Some(400) => format!("the provider rejected the request: {message}"),
        Some(401) => "the configured credentials were rejected".to_string(),
        Some(429) => "the provider is rate limiting requests".to_string(),
        _ => message,
    };
    AdapterError::Provider { status, message }
}

fn is_model_not_found(err: &AdapterError) -> bool {
    let AdapterError::Provider { message, .. } = err else {
        return false;
    };
    let lower = message.to_lowercase();
    lower.contains("model")
        && (lower.contains("not found")
            || lower.contains("not_found")
            || lower.contains("does not exist")
            || lower.contains("invalid model"))
}
