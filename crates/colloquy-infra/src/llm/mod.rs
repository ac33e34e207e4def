//! Concrete provider adapters.
//!
//! One adapter per backend dialect, all speaking through the single
//! shared [`reqwest::Client`] owned by the factory. Each adapter performs
//! exactly one HTTP POST per call (the remap adapter may retry once) and
//! funnels every response body through the core normalizer.

pub mod chat_completion;
pub mod factory;
pub mod http;
pub mod local;
pub mod messages;
pub mod remap;
pub mod template;
