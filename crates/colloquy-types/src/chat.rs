//! Conversation messages and per-user sessions.
//!
//! A `ConversationSession` is an ordered, bounded sequence of messages.
//! Messages are immutable once appended; the session evicts from the
//! oldest end when trimmed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

/// Role of a message in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

impl fmt::Display for ChatRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatRole::User => write!(f, "user"),
            ChatRole::Assistant => write!(f, "assistant"),
        }
    }
}

impl FromStr for ChatRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(ChatRole::User),
            "assistant" => Ok(ChatRole::Assistant),
            other => Err(format!("invalid chat role: '{other}'")),
        }
    }
}

/// A single message in a conversation. Immutable once appended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    /// Create a user message with the current timestamp.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
            created_at: Utc::now(),
        }
    }

    /// Create an assistant message with the current timestamp.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
            created_at: Utc::now(),
        }
    }
}

/// Ordered message history for a single user.
///
/// Created on first interaction. Bounded by the orchestrator: after every
/// completed turn the history is trimmed from the oldest end. `clear`
/// empties the history in place so that external holders of the session
/// keep a valid handle (the id never changes).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSession {
    pub id: Uuid,
    pub messages: Vec<ChatMessage>,
}

impl ConversationSession {
    /// Create an empty session with a fresh id.
    pub fn new() -> Self {
        Self {
            id: Uuid::now_v7(),
            messages: Vec::new(),
        }
    }

    /// Append a message to the end of the history.
    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    /// Remove and return the most recent message, if any.
    pub fn pop(&mut self) -> Option<ChatMessage> {
        self.messages.pop()
    }

    /// Evict the oldest messages until at most `max` remain.
    pub fn trim_to(&mut self, max: usize) {
        if self.messages.len() > max {
            let excess = self.messages.len() - max;
            self.messages.drain(..excess);
        }
    }

    /// Empty the history in place, preserving the session identity.
    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl Default for ConversationSession {
    fn default() -> Self {
        Self::new()
    }
}
