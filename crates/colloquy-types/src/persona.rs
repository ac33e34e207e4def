//! Persona descriptors: named system-prompt templates.

use serde::{Deserialize, Serialize};

/// Name of the persona used when a user has not picked one.
pub const DEFAULT_PERSONA: &str = "default";

/// A named system-prompt template applied to a conversation.
/// Immutable after load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonaDescriptor {
    pub name: String,
    pub prompt: String,
}

impl PersonaDescriptor {
    pub fn new(name: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            prompt: prompt.into(),
        }
    }
}
