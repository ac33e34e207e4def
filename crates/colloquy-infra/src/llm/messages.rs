//! Anthropic-style messages adapter.
//!
//! `POST {base}/v1/messages` with `x-api-key` auth and a pinned
//! `anthropic-version`. The system prompt travels as a top-level field,
//! never inside the message list, and the reply text sits in
//! `content[0].text`.

use secrecy::{ExposeSecret, SecretString};
use serde_json::json;

use colloquy_core::llm::adapter::{ChatAdapter, PromptRequest};
use colloquy_core::llm::normalize::{self, ResponseHint};
use colloquy_types::error::AdapterError;
use colloquy_types::model::{GenerationParams, ModelDescriptor};

use super::http;

const DEFAULT_ENDPOINT: &str = "https://api.anthropic.com";
const API_VERSION: &str = "2023-06-01";

// No Debug derive: holds a credential.
pub struct MessagesAdapter {
    client: reqwest::Client,
    url: String,
    api_key: SecretString,
    model_id: String,
    params: GenerationParams,
    response_path: Option<String>,
}

impl MessagesAdapter {
    pub fn from_descriptor(
        client: reqwest::Client,
        descriptor: &ModelDescriptor,
    ) -> Result<Self, AdapterError> {
        let api_key = descriptor
            .api_key
            .clone()
            .ok_or_else(|| AdapterError::Configuration("api key is not configured".to_string()))?;
        let endpoint = descriptor.endpoint.as_deref().unwrap_or(DEFAULT_ENDPOINT);

        Ok(Self {
            client,
            url: messages_url(endpoint),
            api_key,
            model_id: descriptor.model_id.clone(),
            params: descriptor.params.clone(),
            response_path: descriptor.response_path.clone(),
        })
    }
}

fn messages_url(endpoint: &str) -> String {
    let base = endpoint.trim_end_matches('/');
    if base.ends_with("/v1/messages") {
        base.to_string()
    } else if base.ends_with("/v1") {
        format!("{base}/messages")
    } else {
        format!("{base}/v1/messages")
    }
}

impl ChatAdapter for MessagesAdapter {
    fn kind(&self) -> &'static str {
        "messages"
    }

    async fn call(&self, request: &PromptRequest) -> Result<String, AdapterError> {
        let body = json!({
            "model": self.model_id,
            "system": request.system,
            "messages": http::history_values(&request.messages),
            "temperature": self.params.temperature,
            "max_tokens": self.params.max_tokens,
        });
        let headers = [
            (
                "x-api-key".to_string(),
                self.api_key.expose_secret().to_string(),
            ),
            ("anthropic-version".to_string(), API_VERSION.to_string()),
        ];

        let (status, raw) = http::post_json(&self.client, &self.url, &headers, &body).await?;
        if !(200..300).contains(&status) {
            return Err(http::provider_error(status, &raw));
        }

        normalize::parse(&raw, ResponseHint::Messages, self.response_path.as_deref())
            .map_err(AdapterError::from)
    }
}
