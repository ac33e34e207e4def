//! Error taxonomy for the orchestration core.
//!
//! Adapters and the normalizer return these values across their boundaries;
//! nothing in the hot path panics. Every [`AdapterError`] renders a
//! user-safe message via [`AdapterError::user_message`] -- raw bodies and
//! credentials go only to operator-facing tracing output.

use thiserror::Error;

/// Errors from normalizing a raw provider payload into plain text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizeError {
    #[error("empty response")]
    Empty,

    /// The payload carried an explicit error object.
    #[error("{}", compose_structured(.message, .error_type, .code))]
    Structured {
        message: String,
        error_type: Option<String>,
        code: Option<String>,
    },

    /// No known extractor matched. Carries a bounded excerpt of the raw
    /// body for diagnostics.
    #[error("unrecognized response format: {excerpt}")]
    Unrecognized { excerpt: String },
}

/// Compose "message (type) (code)", omitting absent parts.
fn compose_structured(
    message: &str,
    error_type: &Option<String>,
    code: &Option<String>,
) -> String {
    let mut out = message.to_string();
    if let Some(t) = error_type {
        out.push_str(&format!(" ({t})"));
    }
    if let Some(c) = code {
        out.push_str(&format!(" ({c})"));
    }
    out
}

/// Errors from a provider adapter call.
///
/// Adapters never propagate raw transport or parse failures past their
/// boundary: every variant here maps to displayable text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdapterError {
    /// Missing credential or endpoint. Never retried.
    #[error("adapter configuration error: {0}")]
    Configuration(String),

    /// Timeout, refused connection, interrupted transfer.
    #[error("transport error: {0}")]
    Transport(String),

    /// Non-2xx status or structured error payload.
    #[error("provider error{}: {message}", .status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
    Provider {
        status: Option<u16>,
        message: String,
    },

    /// Unrecognized response shape.
    #[error("unrecognized response format: {excerpt}")]
    Parse { excerpt: String },

    #[error("empty response from provider")]
    EmptyResponse,
}

impl AdapterError {
    /// One conversational sentence describing the failure category in
    /// general terms. Never contains credentials or raw bodies.
    pub fn user_message(&self) -> String {
        match self {
            AdapterError::Configuration(_) => {
                "This model is not configured correctly. Please notify an administrator."
                    .to_string()
            }
            AdapterError::Transport(_) => {
                "The AI service is currently unavailable. Please try again later.".to_string()
            }
            AdapterError::Provider { message, .. } => {
                format!("The AI service returned an error: {message}")
            }
            AdapterError::Parse { .. } => {
                "The AI service returned a response I could not understand.".to_string()
            }
            AdapterError::EmptyResponse => {
                "The AI service returned an empty response.".to_string()
            }
        }
    }
}

impl From<NormalizeError> for AdapterError {
    fn from(err: NormalizeError) -> Self {
        match err {
            NormalizeError::Empty => AdapterError::EmptyResponse,
            NormalizeError::Structured { .. } => AdapterError::Provider {
                status: None,
                message: err.to_string(),
            },
            NormalizeError::Unrecognized { excerpt } => AdapterError::Parse { excerpt },
        }
    }
}

/// Errors from registry admin operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("unknown model: '{0}'")]
    UnknownModel(String),
}
