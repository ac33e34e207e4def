//! Adapter factory over a single shared HTTP client.
//!
//! The registry hands this factory every descriptor on refresh; dialect
//! dispatch happens here so the core crate never sees HTTP machinery.
//! `reqwest::Client` is an `Arc` over its connection pool internally, so
//! cloning it into each adapter is cheap and shares connections.

use std::time::Duration;

use colloquy_core::llm::adapter::AdapterFactory;
use colloquy_core::llm::box_adapter::BoxChatAdapter;
use colloquy_types::error::AdapterError;
use colloquy_types::model::{ModelDescriptor, ProviderSpec};

use super::chat_completion::ChatCompletionAdapter;
use super::local::LocalServerAdapter;
use super::messages::MessagesAdapter;
use super::remap::RemapAdapter;
use super::template::TemplateAdapter;

#[derive(Clone)]
pub struct HttpAdapterFactory {
    client: reqwest::Client,
}

impl HttpAdapterFactory {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .timeout(Duration::from_secs(30))
            .build()
            .expect("failed to create reqwest client");
        Self { client }
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Default for HttpAdapterFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl AdapterFactory for HttpAdapterFactory {
    fn build(&self, descriptor: &ModelDescriptor) -> Result<BoxChatAdapter, AdapterError> {
        let client = self.client.clone();
        let adapter = match &descriptor.provider {
            ProviderSpec::ChatCompletion => {
                BoxChatAdapter::new(ChatCompletionAdapter::from_descriptor(client, descriptor)?)
            }
            ProviderSpec::Messages => {
                BoxChatAdapter::new(MessagesAdapter::from_descriptor(client, descriptor)?)
            }
            ProviderSpec::RemapFallback { .. } => {
                BoxChatAdapter::new(RemapAdapter::from_descriptor(client, descriptor)?)
            }
            ProviderSpec::Template { .. } => {
                BoxChatAdapter::new(TemplateAdapter::from_descriptor(client, descriptor)?)
            }
            ProviderSpec::LocalServer => {
                BoxChatAdapter::new(LocalServerAdapter::from_descriptor(client, descriptor))
            }
        };
        Ok(adapter)
    }
}
