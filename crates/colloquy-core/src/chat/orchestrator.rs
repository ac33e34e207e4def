//! Top-level reply orchestration.
//!
//! `reply` turns one inbound message into zero-or-more outbound text
//! segments: resolve model and persona, append the user turn, invoke the
//! registry, then post-process (sentinel handling, history trimming,
//! segment splitting, rollback on failure).
//!
//! Each reply runs under a bounded semaphore so concurrent chats never
//! spawn unbounded parallel work, and under the per-user session lock so
//! same-user turns serialize. The only suspension point in between is the
//! adapter's network call.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::Semaphore;
use tracing::{debug, warn};

use colloquy_types::chat::ChatMessage;
use colloquy_types::config::OrchestratorSettings;
use colloquy_types::persona::{DEFAULT_PERSONA, PersonaDescriptor};

use crate::llm::adapter::PromptRequest;
use crate::llm::registry::ModelRegistry;

use super::prefs::UserPreferences;
use super::segment::{NO_RESPONSE_SENTINEL, split_reply};
use super::store::ConversationStore;

/// Fixed instruction appended to every persona prompt, describing the
/// multi-message separator and the no-reply sentinel.
const REPLY_FORMAT_INSTRUCTION: &str = "To send several separate messages, put a line containing \
only --- between them. If no reply is warranted, respond with exactly [NO_RESPONSE].";

/// Returned to the user when an internal failure escapes the adapter
/// error taxonomy.
const INTERNAL_ERROR_SEGMENT: &str =
    "Something went wrong while handling your message. Please try again.";

/// Orchestrates per-user conversations over the model registry.
///
/// Generic over [`UserPreferences`] so the core never depends on the
/// external store that persists user choices.
pub struct ConversationOrchestrator<P: UserPreferences> {
    registry: Arc<ModelRegistry>,
    prefs: P,
    personas: RwLock<HashMap<String, PersonaDescriptor>>,
    store: ConversationStore,
    settings: OrchestratorSettings,
    permits: Semaphore,
}

impl<P: UserPreferences> ConversationOrchestrator<P> {
    pub fn new(
        registry: Arc<ModelRegistry>,
        prefs: P,
        personas: Vec<PersonaDescriptor>,
        settings: OrchestratorSettings,
    ) -> Self {
        let permits = Semaphore::new(settings.max_concurrent_replies);
        Self {
            registry,
            prefs,
            personas: RwLock::new(index_personas(personas)),
            store: ConversationStore::new(),
            settings,
            permits,
        }
    }

    /// Access the model registry (admin surface: list, details, reset,
    /// refresh).
    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    /// Access the preference store.
    pub fn prefs(&self) -> &P {
        &self.prefs
    }

    /// Access the session store (transport layers needing raw history).
    pub fn store(&self) -> &ConversationStore {
        &self.store
    }

    /// Replace the persona set wholesale (configuration reload).
    pub fn set_personas(&self, personas: Vec<PersonaDescriptor>) {
        *self
            .personas
            .write()
            .unwrap_or_else(PoisonError::into_inner) = index_personas(personas);
    }

    /// Produce ordered outbound segments for one inbound message.
    ///
    /// An empty result means the message is silently absorbed. Failures
    /// never propagate: they surface as a single error-category segment,
    /// and the just-appended user turn is rolled back so a failed attempt
    /// never pollutes the context of the next one.
    pub async fn reply(&self, user_id: &str, text: &str) -> Vec<String> {
        let _permit = match self.permits.acquire().await {
            Ok(permit) => permit,
            Err(_) => {
                warn!(user = %user_id, "Reply permit pool closed");
                return vec![INTERNAL_ERROR_SEGMENT.to_string()];
            }
        };

        let model = self.resolve_model(user_id).await;
        let system = self.build_system_prompt(user_id).await;

        let session = self.store.session(user_id);
        let mut session = session.lock().await;

        session.push(ChatMessage::user(text));
        let request = PromptRequest {
            system,
            messages: session.messages.clone(),
        };

        match self.registry.invoke(&model, &request).await {
            Ok(raw) => {
                let trimmed = raw.trim().to_string();
                if trimmed == NO_RESPONSE_SENTINEL {
                    // An empty assistant turn preserves role alternation.
                    debug!(user = %user_id, "Model chose not to reply");
                    session.push(ChatMessage::assistant(""));
                    session.trim_to(self.settings.max_history);
                    return Vec::new();
                }

                session.push(ChatMessage::assistant(&raw));
                session.trim_to(self.settings.max_history);

                let mut segments = split_reply(&trimmed);
                if segments.len() > self.settings.max_segments {
                    warn!(
                        user = %user_id,
                        produced = segments.len(),
                        cap = self.settings.max_segments,
                        "Reply truncated to segment cap"
                    );
                    segments.truncate(self.settings.max_segments);
                }
                segments
            }
            Err(err) => {
                // Roll back the user turn appended above.
                session.pop();
                warn!(user = %user_id, model = %model, error = %err, "Reply failed");
                vec![err.user_message()]
            }
        }
    }

    /// Empty a user's history in place; the session identity survives.
    pub async fn clear_conversation(&self, user_id: &str) {
        self.store.clear(user_id).await;
        debug!(user = %user_id, "Conversation cleared");
    }

    /// Short operator-facing summary: the last three turns, each content
    /// clipped to fifty characters.
    pub async fn conversation_summary(&self, user_id: &str) -> String {
        let Some(session) = self.store.get(user_id) else {
            return "(no conversation)".to_string();
        };
        let session = session.lock().await;
        if session.is_empty() {
            return "(no conversation)".to_string();
        }

        let start = session.len().saturating_sub(3);
        session.messages[start..]
            .iter()
            .map(|m| format!("{}: {}", m.role, clip(&m.content, 50)))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Save a model choice for a user. Returns false (and saves nothing)
    /// for names the registry does not know.
    pub async fn set_user_model(&self, user_id: &str, model: &str) -> bool {
        if !self.registry.contains(model) {
            return false;
        }
        self.prefs.set_user_model(user_id, model).await;
        true
    }

    /// Save a persona choice for a user and clear their conversation --
    /// history produced under one persona must not leak into another.
    /// Returns false (and changes nothing) for unknown personas.
    pub async fn set_user_persona(&self, user_id: &str, persona: &str) -> bool {
        let known = self
            .personas
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(persona);
        if !known {
            return false;
        }
        self.prefs.set_user_persona(user_id, persona).await;
        self.store.clear(user_id).await;
        debug!(user = %user_id, %persona, "Persona switched, conversation cleared");
        true
    }

    /// Saved choice, then the preference store's default, then the
    /// registry's configured default.
    async fn resolve_model(&self, user_id: &str) -> String {
        if let Some(model) = self.prefs.user_model(user_id).await {
            return model;
        }
        if let Some(model) = self.prefs.default_model().await {
            return model;
        }
        self.registry.default_model()
    }

    async fn build_system_prompt(&self, user_id: &str) -> String {
        let persona_name = self
            .prefs
            .user_persona(user_id)
            .await
            .unwrap_or_else(|| DEFAULT_PERSONA.to_string());

        let personas = self
            .personas
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        let prompt = personas
            .get(&persona_name)
            .or_else(|| personas.get(DEFAULT_PERSONA))
            .map(|p| p.prompt.clone())
            .unwrap_or_default();
        drop(personas);

        if prompt.is_empty() {
            REPLY_FORMAT_INSTRUCTION.to_string()
        } else {
            format!("{prompt}\n\n{REPLY_FORMAT_INSTRUCTION}")
        }
    }
}

fn index_personas(personas: Vec<PersonaDescriptor>) -> HashMap<String, PersonaDescriptor> {
    personas.into_iter().map(|p| (p.name.clone(), p)).collect()
}

/// Clip to `max` characters, appending an ellipsis when truncated.
fn clip(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let clipped: String = text.chars().take(max).collect();
        format!("{clipped}...")
    }
}
