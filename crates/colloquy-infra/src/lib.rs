//! Infrastructure implementations for Colloquy: the concrete provider
//! adapters over a single shared HTTP transport, and TOML configuration
//! loading.

pub mod config;
pub mod llm;
