//! OpenAI-style chat-completion adapter.
//!
//! The most common dialect: `POST {base}/v1/chat/completions` with a
//! bearer token, system prompt as the leading message, and the reply in
//! `choices[0].message.content`.

use secrecy::{ExposeSecret, SecretString};
use serde_json::json;

use colloquy_core::llm::adapter::{ChatAdapter, PromptRequest};
use colloquy_core::llm::normalize::{self, ResponseHint};
use colloquy_types::error::AdapterError;
use colloquy_types::model::{GenerationParams, ModelDescriptor};

use super::http;

// No Debug derive: holds a credential.
pub struct ChatCompletionAdapter {
    client: reqwest::Client,
    url: String,
    api_key: SecretString,
    model_id: String,
    params: GenerationParams,
    response_path: Option<String>,
}

impl ChatCompletionAdapter {
    pub fn from_descriptor(
        client: reqwest::Client,
        descriptor: &ModelDescriptor,
    ) -> Result<Self, AdapterError> {
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
            params: descriptor.params.clone(),
            response_path: descriptor.response_path.clone(),
        })
    }
}

impl ChatAdapter for ChatCompletionAdapter {
    fn kind(&self) -> &'static str {
        "chat_completion"
    }

    async fn call(&self, request: &PromptRequest) -> Result<String, AdapterError> {
        let body = json!({
            "model": self.model_id,
            "messages": http::messages_with_system(&request.system, &request.messages),
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
