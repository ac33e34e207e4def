//! Per-user conversation sessions.
//!
//! Sessions are keyed by an opaque user id and created on first
//! interaction. Each session sits behind its own async mutex: two
//! concurrent replies for the same user serialize, while different users
//! never block one another.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;

use colloquy_types::chat::ConversationSession;

/// Owns the userId -> session map.
#[derive(Default)]
pub struct ConversationStore {
    sessions: DashMap<String, Arc<Mutex<ConversationSession>>>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the session for a user, creating it on first interaction.
    pub fn session(&self, user_id: &str) -> Arc<Mutex<ConversationSession>> {
        self.sessions
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(ConversationSession::new())))
            .clone()
    }

    /// Get the session for a user without creating one.
    pub fn get(&self, user_id: &str) -> Option<Arc<Mutex<ConversationSession>>> {
        self.sessions.get(user_id).map(|entry| entry.clone())
    }

    /// Empty a user's history in place. The session object (and its id)
    /// survives for any external holder. No-op for unknown users.
    pub async fn clear(&self, user_id: &str) {
        if let Some(session) = self.get(user_id) {
            session.lock().await.clear();
        }
    }
}
