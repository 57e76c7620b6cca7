//! Page Classifier
//!
//! Asks the completion service whether a page has learnable content and, if
//! so, which knowledge points it contains. The answer is requested as JSON
//! matching [`page_schema`].

use crate::error::AnalysisError;
use crate::llm::{JsonSchema, LLMProvider, Message};
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const PAGE_INSTRUCTIONS: &str = r#"Analyze this page as if you're studying from a book.

SKIP content if the page contains:
- Table of contents
- Chapter listings
- Index pages
- Blank pages
- Copyright information
- Publishing details
- References or bibliography
- Acknowledgments

DO extract knowledge if the page contains:
- Preface content that explains important concepts
- Actual educational content
- Key definitions and concepts
- Important arguments or theories
- Examples and case studies
- Significant findings or conclusions
- Methodologies or frameworks
- Critical analyses or interpretations

For valid content:
- Set has_content to true
- Extract detailed, learnable knowledge points
- Include important quotes or key statements
- Capture examples with their context
- Preserve technical terms and definitions

For pages to skip:
- Set has_content to false
- Return empty knowledge list

Answer with a JSON object: {"has_content": bool, "knowledge": [string]}"#;

/// Classification of one page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageContent {
    pub has_content: bool,
    #[serde(default)]
    pub knowledge: Vec<String>,
}

impl PageContent {
    pub fn skip() -> Self {
        Self {
            has_content: false,
            knowledge: Vec::new(),
        }
    }

    pub fn with_knowledge(knowledge: Vec<String>) -> Self {
        Self {
            has_content: true,
            knowledge,
        }
    }

    /// Knowledge to append: nothing unless the page has content.
    pub fn into_knowledge(self) -> Vec<String> {
        if self.has_content {
            self.knowledge
        } else {
            Vec::new()
        }
    }
}

/// Decides what a page teaches.
#[async_trait]
pub trait PageClassifier: Send + Sync {
    async fn classify(&self, page_text: &str) -> Result<PageContent>;
}

/// Classifier backed by an LLM with structured output.
pub struct LlmClassifier {
    provider: Arc<dyn LLMProvider>,
}

impl LlmClassifier {
    pub fn new(provider: Arc<dyn LLMProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl PageClassifier for LlmClassifier {
    async fn classify(&self, page_text: &str) -> Result<PageContent> {
        let messages = [
            Message::system(PAGE_INSTRUCTIONS),
            Message::user(format!("Page text: {}", page_text)),
        ];
        let response = self
            .provider
            .structured_completion(&messages, &page_schema())
            .await?;
        parse_page_content(&response.content)
    }
}

/// JSON schema for [`PageContent`].
pub fn page_schema() -> JsonSchema {
    JsonSchema::new(
        "page_content",
        serde_json::json!({
            "type": "object",
            "properties": {
                "has_content": {"type": "boolean"},
                "knowledge": {"type": "array", "items": {"type": "string"}}
            },
            "required": ["has_content", "knowledge"],
            "additionalProperties": false
        }),
    )
}

/// Parse the model's answer, tolerating a ```json fence around it.
pub fn parse_page_content(raw: &str) -> Result<PageContent> {
    let trimmed = raw.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.trim_end().strip_suffix("```"))
        .unwrap_or(trimmed);

    serde_json::from_str(body.trim())
        .map_err(|e| AnalysisError::InvalidResponse(format!("page classification: {}", e)).into())
}
