//! OpenAI API Provider.
//!
//! Implements the `LLMProvider` trait for OpenAI-compatible Chat Completions
//! endpoints, including `response_format: json_schema` structured output.

use super::provider::{LLMProvider, ModelMetadata};
use super::types::{CompletionResponse, JsonSchema, Message, Role, Usage};
use crate::error::AnalysisError;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

/// OpenAI Provider configuration and state.
pub struct OpenAIProvider {
    client: Client,
    api_key: String,
    api_base: String,
    model: String,
}

impl OpenAIProvider {
    pub fn new(api_key: String, model: String) -> Self {
        Self::with_base(api_key, OPENAI_API_BASE.to_string(), model)
    }

    /// Provider pointed at any OpenAI-compatible base URL (e.g. a local proxy).
    pub fn with_base(api_key: String, api_base: String, model: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            api_base: api_base.trim_end_matches('/').to_string(),
            model,
        }
    }

    /// Build a provider using the `OPENAI_API_KEY` environment variable.
    pub fn from_env(api_base: &str, model: &str) -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| AnalysisError::MissingApiKey)?;
        Ok(Self::with_base(api_key, api_base.to_string(), model.to_string()))
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.api_base)
    }

    async fn send(&self, request: &ChatRequest) -> Result<CompletionResponse> {
        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .context("Failed to send request to OpenAI")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("OpenAI API error ({}): {}", status, error_text));
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .context("Failed to parse OpenAI response")?;

        chat_response.into_completion()
    }
}

#[async_trait]
impl LLMProvider for OpenAIProvider {
    fn metadata(&self) -> ModelMetadata {
        let window = match self.model.as_str() {
            m if m.starts_with("gpt-4o") || m.starts_with("o1") => 128_000,
            "gpt-4-turbo" | "gpt-4-turbo-preview" => 128_000,
            "gpt-4" => 8_192,
            "gpt-3.5-turbo" => 16_385,
            _ => 4_096, // Default safe assumption
        };

        ModelMetadata {
            id: self.model.clone(),
            context_window: window,
        }
    }

    async fn completion(&self, messages: &[Message]) -> Result<CompletionResponse> {
        let request = ChatRequest::new(&self.model, messages, None);
        self.send(&request).await
    }

    async fn structured_completion(
        &self,
        messages: &[Message],
        schema: &JsonSchema,
    ) -> Result<CompletionResponse> {
        let request = ChatRequest::new(&self.model, messages, Some(schema));
        self.send(&request).await
    }
}

// -----------------------------------------------------------------------------
// OpenAI DTOs (Data Transfer Objects)
// -----------------------------------------------------------------------------

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ApiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ApiResponseFormat>,
}

impl ChatRequest {
    fn new(model: &str, messages: &[Message], schema: Option<&JsonSchema>) -> Self {
        Self {
            model: model.to_string(),
            messages: messages.iter().map(ApiMessage::from).collect(),
            response_format: schema.map(|s| ApiResponseFormat {
                kind: "json_schema",
                json_schema: ApiJsonSchema {
                    name: s.name.clone(),
                    schema: s.schema.clone(),
                    strict: true,
                },
            }),
        }
    }
}

#[derive(Serialize)]
struct ApiMessage {
    role: &'static str,
    content: String,
}

impl From<&Message> for ApiMessage {
    fn from(msg: &Message) -> Self {
        Self {
            role: match msg.role {
                Role::System => "system",
                Role::User => "user",
                Role::Assistant => "assistant",
            },
            content: msg.content.clone(),
        }
    }
}

#[derive(Serialize)]
struct ApiResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
    json_schema: ApiJsonSchema,
}

#[derive(Serialize)]
struct ApiJsonSchema {
    name: String,
    schema: serde_json::Value,
    strict: bool,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<ApiUsage>,
}

impl ChatResponse {
    fn into_completion(self) -> Result<CompletionResponse> {
        let usage = self.usage.map(Usage::from).unwrap_or_default();
        let choice = self
            .choices
            .into_iter()
            .next()
            .context("No choices returned from OpenAI")?;

        match (choice.message.content, choice.message.refusal) {
            (Some(content), _) => Ok(CompletionResponse { content, usage }),
            (None, Some(refusal)) => {
                Err(AnalysisError::InvalidResponse(format!("model refused: {}", refusal)).into())
            }
            (None, None) => Err(AnalysisError::InvalidResponse("empty message content".into()).into()),
        }
    }
}

#[derive(Deserialize)]
struct Choice {
    message: ApiResponseMessage,
}

#[derive(Deserialize)]
struct ApiResponseMessage {
    content: Option<String>,
    #[serde(default)]
    refusal: Option<String>,
}

#[derive(Deserialize)]
struct ApiUsage {
    prompt_tokens: usize,
    completion_tokens: usize,
    total_tokens: usize,
}

impl From<ApiUsage> for Usage {
    fn from(u: ApiUsage) -> Self {
        Self {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_without_schema_omits_response_format() {
        let request = ChatRequest::new("gpt-4o-mini", &[Message::user("hi")], None);
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(value["model"], "gpt-4o-mini");
        assert_eq!(value["messages"][0]["role"], "user");
        assert!(value.get("response_format").is_none());
    }

    #[test]
    fn test_request_with_schema() {
        let schema = JsonSchema::new("page_content", json!({"type": "object"}));
        let request = ChatRequest::new(
            "gpt-4o-mini",
            &[Message::system("rules"), Message::user("page")],
            Some(&schema),
        );
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(value["response_format"]["type"], "json_schema");
        assert_eq!(value["response_format"]["json_schema"]["name"], "page_content");
        assert_eq!(value["response_format"]["json_schema"]["strict"], true);
        assert_eq!(value["messages"][0]["role"], "system");
    }

    #[test]
    fn test_parse_response() {
        let raw = r#"{
            "choices": [{"message": {"role": "assistant", "content": "hello"}}],
            "usage": {"prompt_tokens": 3, "completion_tokens": 1, "total_tokens": 4}
        }"#;
        let parsed: ChatResponse = serde_json::from_str(raw).unwrap();
        let completion = parsed.into_completion().unwrap();

        assert_eq!(completion.content, "hello");
        assert_eq!(completion.usage.total_tokens, 4);
    }

    #[test]
    fn test_parse_refusal() {
        let raw = r#"{"choices": [{"message": {"content": null, "refusal": "no"}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(raw).unwrap();
        let err = parsed.into_completion().unwrap_err();

        assert!(err.to_string().contains("refused"));
    }

    #[test]
    fn test_metadata_windows() {
        let provider = OpenAIProvider::new("key".into(), "gpt-4o-mini".into());
        assert_eq!(provider.metadata().context_window, 128_000);

        let provider = OpenAIProvider::new("key".into(), "mystery".into());
        assert_eq!(provider.metadata().context_window, 4_096);
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let provider = OpenAIProvider::with_base("key".into(), "http://localhost:8080/v1/".into(), "m".into());
        assert_eq!(provider.endpoint(), "http://localhost:8080/v1/chat/completions");
    }
}
