//! LLM Layer
//!
//! This module handles all interactions with the completion service:
//! - Provider abstraction (OpenAI-compatible endpoints, test doubles)
//! - Universal message/response types
//! - Structured (JSON schema) output requests used for page classification

pub mod types;
pub mod provider;
pub mod openai;

// Re-export key types
pub use types::{CompletionResponse, JsonSchema, Message, Role, Usage};
pub use provider::{LLMProvider, ModelMetadata};
pub use openai::{OpenAIProvider, OPENAI_API_BASE};
