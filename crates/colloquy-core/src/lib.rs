//! Orchestration logic and ports for Colloquy.
//!
//! This crate turns an inbound chat message plus per-user state into
//! zero-or-more outbound text segments: it resolves a model and persona,
//! invokes the model registry (which tracks per-model health and biases
//! future selection), normalizes the provider response, and applies
//! history bookkeeping and multi-segment splitting.
//!
//! It defines the "ports" (the [`llm::adapter::ChatAdapter`] and
//! [`llm::adapter::AdapterFactory`] traits, the
//! [`chat::prefs::UserPreferences`] trait) that the infrastructure layer
//! implements. It depends only on `colloquy-types` -- never on
//! `colloquy-infra` or any HTTP crate.

pub mod chat;
pub mod llm;
