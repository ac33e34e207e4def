//! ChatAdapter trait definition.
//!
//! This is the core abstraction every provider backend implements: it
//! serializes one canonical (system prompt, history) request into the
//! backend's own dialect, performs exactly one HTTP call, and delegates
//! response parsing to the normalizer. Uses RPITIT for `call`
//! (Rust 2024 edition); `BoxChatAdapter` provides dynamic dispatch.

use colloquy_types::chat::ChatMessage;
use colloquy_types::error::AdapterError;
use colloquy_types::model::ModelDescriptor;

use super::box_adapter::BoxChatAdapter;

/// Canonical request shape handed to every adapter.
///
/// The adapter owns the translation into its wire dialect; model id and
/// generation parameters come from the descriptor the adapter was built
/// from.
#[derive(Debug, Clone)]
pub struct PromptRequest {
    /// Composed system prompt (persona plus reply-format instructions).
    pub system: String,
    /// Ordered conversation history, oldest first.
    pub messages: Vec<ChatMessage>,
}

/// Trait for provider adapter backends.
///
/// Implementations live in colloquy-infra. An adapter never propagates a
/// raw transport or parse failure: every outcome is either normalized
/// text or an [`AdapterError`] whose `user_message()` is safe to display.
pub trait ChatAdapter: Send + Sync {
    /// Dialect tag (e.g. "chat_completion", "messages").
    fn kind(&self) -> &'static str;

    /// Perform one call and normalize the response to plain text.
    fn call(
        &self,
        request: &PromptRequest,
    ) -> impl std::future::Future<Output = Result<String, AdapterError>> + Send;
}

/// Builds a concrete adapter for a descriptor.
///
/// The registry calls this on refresh so that colloquy-core never
/// constructs HTTP machinery itself; the composition root injects a
/// factory holding the single shared transport.
pub trait AdapterFactory: Send + Sync {
    fn build(&self, descriptor: &ModelDescriptor) -> Result<BoxChatAdapter, AdapterError>;
}
