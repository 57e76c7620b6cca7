//! The Provider Abstraction.
//!
//! This trait defines the standard interface for any completion backend,
//! whether it's a cloud API (OpenAI) or a scripted double in tests.

use anyhow::Result;
use async_trait::async_trait;
use super::types::{CompletionResponse, JsonSchema, Message};

/// Metadata about a model's capabilities.
#[derive(Debug, Clone)]
pub struct ModelMetadata {
    pub id: String,
    pub context_window: usize,
}

/// The core trait for LLM interactions.
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Get the model's metadata (context window, ID, etc).
    fn metadata(&self) -> ModelMetadata;

    /// Estimate the number of tokens in a string.
    ///
    /// Rule of thumb: 1 token ~= 4 characters.
    fn count_tokens(&self, text: &str) -> usize {
        text.chars().count() / 4
    }

    /// Send a chat completion request.
    async fn completion(&self, messages: &[Message]) -> Result<CompletionResponse>;

    /// Send a chat completion request whose answer must be JSON matching `schema`.
    ///
    /// Providers without native structured output fall back to a plain
    /// completion; callers still validate the returned JSON.
    async fn structured_completion(
        &self,
        messages: &[Message],
        schema: &JsonSchema,
    ) -> Result<CompletionResponse> {
        let _ = schema;
        self.completion(messages).await
    }
}
