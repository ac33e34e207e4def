//! Conversation state and the top-level reply orchestrator.

pub mod orchestrator;
pub mod prefs;
pub mod segment;
pub mod store;
