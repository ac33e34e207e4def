//! Shared domain types for Colloquy.
//!
//! Chat messages and sessions, model descriptors and their admin-facing
//! status projections, personas, typed configuration, and the error
//! taxonomy shared by the core and infrastructure crates.

pub mod chat;
pub mod config;
pub mod error;
pub mod model;
pub mod persona;
