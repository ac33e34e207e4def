//! Shared HTTP plumbing for the provider adapters.
//!
//! Maps transport failures and non-2xx statuses into [`AdapterError`]
//! values whose user-facing messages never leak credentials or raw
//! bodies; raw payloads go only to tracing output.

use std::time::Duration;

use serde_json::Value;
use tracing::debug;

use colloquy_core::llm::normalize;
use colloquy_types::chat::ChatMessage;
use colloquy_types::error::AdapterError;

/// Per-request timeout covering connect and read.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Issue one JSON POST and return the status plus raw body text.
pub async fn post_json(
    client: &reqwest::Client,
    url: &str,
    headers: &[(String, String)],
    body: &Value,
) -> Result<(u16, String), AdapterError> {
    let mut request = client
        .post(url)
        .timeout(REQUEST_TIMEOUT)
        .header("content-type", "application/json")
        .json(body);
    for (name, value) in headers {
        request = request.header(name, value);
    }

    let response = request.send().await.map_err(|err| {
        if err.is_timeout() {
            AdapterError::Transport("request timed out".to_string())
        } else {
            AdapterError::Transport("connection failed".to_string())
        }
    })?;

    let status = response.status().as_u16();
    let raw = response
        .text()
        .await
        .map_err(|_| AdapterError::Transport("response transfer interrupted".to_string()))?;

    Ok((status, raw))
}

/// Build a provider error for a non-2xx status, preferring the structured
/// error message inside the body over a bare status line.
pub fn provider_error(status: u16, raw: &str) -> AdapterError {
    debug!(status, body = %normalize::excerpt(raw), "Provider returned an error status");

    let message = serde_json::from_str::<Value>(raw)
        .ok()
        .and_then(|v| extract_error_message(&v))
        .unwrap_or_else(|| format!("request failed with status {status}"));

    AdapterError::Provider {
        status: Some(status),
        message,
    }
}

fn extract_error_message(value: &Value) -> Option<String> {
    let err = value.get("error")?;
    match err {
        Value::String(s) => Some(s.clone()),
        Value::Object(obj) => obj
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    }
}

/// Normalize a base URL to end at the canonical chat-completions path.
pub fn completions_url(endpoint: &str) -> String {
    let base = endpoint.trim_end_matches('/');
    if base.ends_with("/chat/completions") {
        base.to_string()
    } else if base.ends_with("/v1") {
        format!("{base}/chat/completions")
    } else {
        format!("{base}/v1/chat/completions")
    }
}

/// Conversation history as wire messages (`{"role", "content"}`).
pub fn history_values(messages: &[ChatMessage]) -> Vec<Value> {
    messages
        .iter()
        .map(|m| serde_json::json!({ "role": m.role.to_string(), "content": m.content }))
        .collect()
}

/// History with a leading system message, the common chat-completion
/// layout.
pub fn messages_with_system(system: &str, messages: &[ChatMessage]) -> Vec<Value> {
    let mut out = Vec::with_capacity(messages.len() + 1);
    out.push(serde_json::json!({ "role": "system", "content": system }));
    out.extend(history_values(messages));
    out
}
