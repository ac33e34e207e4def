//! Adapter for OpenAI-compatible local inference servers.
//!
//! Same wire shape as the chat-completion dialect but no credential is
//! required and the endpoint defaults to localhost. Servers in this
//! family sometimes answer with a bare `{"response": "..."}` body, which
//! the extractor chain already covers.

use secrecy::{ExposeSecret, SecretString};
use serde_json::json;

use colloquy_core::llm::adapter::{ChatAdapter, PromptRequest};
use colloquy_core::llm::normalize::{self, ResponseHint};
use colloquy_types::error::AdapterError;
use colloquy_types::model::{GenerationParams, ModelDescriptor};

use super::http;

const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:8080";

pub struct LocalServerAdapter {
    client: reqwest::Client,
    url: String,
    api_key: Option<SecretString>,
    model_id: String,
    params: GenerationParams,
    response_path: Option<String>,
}

impl LocalServerAdapter {
    pub fn from_descriptor(client: reqwest::Client, descriptor: &ModelDescriptor) -> Self {
        let endpoint = descriptor.endpoint.as_deref().unwrap_or(DEFAULT_ENDPOINT);
        Self {
            client,
            url: http::completions_url(endpoint),
            api_key: descriptor.api_key.clone(),
            model_id: descriptor.model_id.clone(),
            params: descriptor.params.clone(),
            response_path: descriptor.response_path.clone(),
        }
    }
}

impl ChatAdapter for LocalServerAdapter {
    fn kind(&self) -> &'static str {
        "local_server"
    }

    async fn call(&self, request: &PromptRequest) -> Result<String, AdapterError> {
        let body = json!({
            "model": self.model_id,
            "messages": http::messages_with_system(&request.system, &request.messages),
            "temperature": self.params.temperature,
            "max_tokens": self.params.max_tokens,
        });
        let mut headers = Vec::new();
        if let Some(key) = &self.api_key {
            headers.push((
                "authorization".to_string(),
                format!("Bearer {}", key.expose_secret()),
            ));
        }

        let (status, raw) = http::post_json(&self.client, &self.url, &headers, &body).await?;
        if !(200..300).contains(&status) {
            return Err(http::provider_error(status, &raw));
        }

        normalize::parse(&raw, ResponseHint::ChatCompletion, self.response_path.as_deref())
            .map_err(AdapterError::from)
    }
}
