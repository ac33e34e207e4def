//! Template adapter: caller-supplied request body and header map.
//!
//! The escape hatch for backends none of the fixed dialects cover. The
//! configured body is cloned per call and the conversation is merged into
//! its `messages` array; header values may carry an `{api_key}` token that
//! is substituted at send time. Extraction relies on the descriptor's
//! `response_path` plus the ordinary extractor chain.

use std::collections::HashMap;

use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;

use colloquy_core::llm::adapter::{ChatAdapter, PromptRequest};
use colloquy_core::llm::normalize::{self, ResponseHint};
use colloquy_types::error::AdapterError;
use colloquy_types::model::{ModelDescriptor, ProviderSpec};

use super::http;

const API_KEY_TOKEN: &str = "{api_key}";

// No Debug derive: holds a credential.
pub struct TemplateAdapter {
    client: reqwest::Client,
    url: String,
    api_key: Option<SecretString>,
    body: Value,
    headers: HashMap<String, String>,
    response_path: Option<String>,
}

impl TemplateAdapter {
    pub fn from_descriptor(
        client: reqwest::Client,
        descriptor: &ModelDescriptor,
    ) -> Result<Self, AdapterError> {
        let ProviderSpec::Template { body, headers } = &descriptor.provider else {
            return Err(AdapterError::Configuration(
                "descriptor is not a template provider".to_string(),
            ));
        };
        // The template endpoint is used verbatim, no path normalization.
        let endpoint = descriptor
            .endpoint
            .as_deref()
            .ok_or_else(|| AdapterError::Configuration("endpoint is not configured".to_string()))?;

        let wants_key = headers.values().any(|v| v.contains(API_KEY_TOKEN));
        if wants_key && descriptor.api_key.is_none() {
            return Err(AdapterError::Configuration(
                "headers reference {api_key} but no api key is configured".to_string(),
            ));
        }

        Ok(Self {
            client,
            url: endpoint.to_string(),
            api_key: descriptor.api_key.clone(),
            body: body.clone(),
            headers: headers.clone(),
            response_path: descriptor.response_path.clone(),
        })
    }

    fn build_body(&self, request: &PromptRequest) -> Value {
        let mut body = self.body.clone();
        let turns = http::messages_with_system(&request.system, &request.messages);
        match body.get_mut("messages").and_then(Value::as_array_mut) {
            Some(existing) => existing.extend(turns),
            None => {
                if let Value::Object(obj) = &mut body {
                    obj.insert("messages".to_string(), Value::Array(turns));
                }
            }
        }
        body
    }

    fn build_headers(&self) -> Vec<(String, String)> {
        self.headers
            .iter()
            .map(|(name, value)| {
                let value = match &self.api_key {
                    Some(key) if value.contains(API_KEY_TOKEN) => {
                        value.replace(API_KEY_TOKEN, key.expose_secret())
                    }
                    _ => value.clone(),
                };
                (name.clone(), value)
            })
            .collect()
    }
}

impl ChatAdapter for TemplateAdapter {
    fn kind(&self) -> &'static str {
        "template"
    }

    async fn call(&self, request: &PromptRequest) -> Result<String, AdapterError> {
        let body = self.build_body(request);
        let headers = self.build_headers();

        let (status, raw) = http::post_json(&self.client, &self.url, &headers, &body).await?;
        if !(200..300).contains(&status) {
            return Err(http::provider_error(status, &raw));
        }

        normalize::parse(&raw, ResponseHint::Unspecified, self.response_path.as_deref())
            .map_err(AdapterError::from)
    }
}
