//! Summarizer: prompt orchestration for markdown study guides.
//!
//! The LLM does the writing; this module decides what it sees. Only the first
//! line of the last [`CONTEXT_WINDOW`] summaries is shown as context so the
//! prompt stays bounded however long the run.

use crate::llm::{LLMProvider, Message};
use anyhow::Result;
use log::{info, warn};
use std::sync::Arc;

/// Number of previous summaries shown to the summarizer.
pub const CONTEXT_WINDOW: usize = 5;

/// Characters of each previous summary's first line shown as a topic.
const TOPIC_PREVIEW_CHARS: usize = 100;

const NO_PREVIOUS: &str = "No previous analyses";

const ANALYSIS_INSTRUCTIONS: &str = r####"Create a comprehensive and detailed summary of NEW content using markdown. Follow these guidelines carefully:

Difficulty Rating:
Rate each section's complexity:
🟢 Basic - Fundamental concepts, no prior knowledge needed
🟡 Intermediate - Builds on basic concepts
🔴 Advanced - Requires strong understanding of prerequisites

1. Book Context and Overview:
   - Start with a "Quick Take" summary (2-3 sentences)
   - Provide chapter/section number and title
   - List key themes and topics covered
   - Explain target audience and required background
   - Rate section difficulty (🟢/🟡/🔴)

2. Key Concepts (Minimum 5):
   - Start each concept with an "In Simple Terms" explanation
   - Follow with "Deep Dive" technical details
   - Use analogies and metaphors for complex ideas
   - Show "Before → After" knowledge progression
   - Include "Common Misconceptions" warnings
   - Rate each concept's difficulty (🟢/🟡/🔴)

3. Technical Details:
   - Begin with "ELI5" (Explain Like I'm 5) overview
   - Use progressive disclosure - simple to complex
   - Include "Quick Reference" tables
   - Provide "Step-by-Step" breakdowns
   - Add "Pro Tips" and "Gotchas"
   - Show "Real-World Examples"

4. Visual Learning Aids:
   | Concept | Simple Terms | Technical Details | Example |
   |---------|--------------|-------------------|---------|
   | ...     | ...          | ...               | ...     |

5. Knowledge Maps:
   ```
   [Prerequisite] → [Current Topic] → [Advanced Applications]
   ```

6. Practice and Application:
   - "Try This" exercises
   - "Think About" discussion points
   - "What If" scenarios
   - "Common Problems" and solutions

7. Quick Reference Cards:
   ```
   📌 Quick Reference: [Topic]
   Definition:
   Key Points:
   Watch Out For:
   ```

8. Learning Path:
   [Beginner] → Basic Concepts (🟢) → [Intermediate] → Applied Knowledge (🟡) → [Advanced] → Expert Topics (🔴)

9. Summary and Next Steps:
   - Use a "### 5-Minute Summary" heading for quick review
   - "Key Takeaways" checklist
   - "Next Topics" preview
   - "Further Reading" suggestions
   - "Practice Projects" ideas

Formatting Enhancements:
- Use 💡 for insights
- Use ⚠️ for warnings
- Use 📌 for key points
- Use 🔍 for detailed explanations
- Use 💪 for practice exercises
- Use 🌟 for pro tips
- Use 🎯 for learning objectives
- Use ✅ for completion checklist

Previous Summary Topics:
{previous_topics}

Remember to:
1. Use the "Explain, Example, Exercise" pattern
2. Include "Why This Matters" for each topic
3. Add "In Practice" scenarios
4. Provide "Common Mistakes" warnings
5. Create "Quick Review" sections
6. Use progressive complexity
7. Reference previous knowledge

Current Content Analysis:
"####;

/// Builds summary prompts and sends them to the completion service.
pub struct Summarizer {
    provider: Arc<dyn LLMProvider>,
    context_window: usize,
}

impl Summarizer {
    pub fn new(provider: Arc<dyn LLMProvider>) -> Self {
        Self {
            provider,
            context_window: CONTEXT_WINDOW,
        }
    }

    pub fn with_context_window(mut self, context_window: usize) -> Self {
        self.context_window = context_window;
        self
    }

    /// Summarize `batch` with the tail of `previous` as context.
    ///
    /// An empty batch returns an empty string without calling the service.
    pub async fn summarize(&self, batch: &[String], previous: &[String]) -> Result<String> {
        if batch.is_empty() {
            info!("Skipping analysis: no knowledge points collected");
            return Ok(String::new());
        }

        info!("Generating analysis of {} knowledge points...", batch.len());
        let messages = build_messages(batch, previous, self.context_window);

        let metadata = self.provider.metadata();
        let estimated: usize = messages
            .iter()
            .map(|m| self.provider.count_tokens(&m.content))
            .sum();
        if estimated > metadata.context_window {
            warn!(
                "summary prompt (~{} tokens) exceeds {} context window ({})",
                estimated, metadata.id, metadata.context_window
            );
        }

        let response = self.provider.completion(&messages).await?;
        Ok(response.content)
    }
}

/// System + user messages for one summary request.
pub fn build_messages(batch: &[String], previous: &[String], context_window: usize) -> Vec<Message> {
    vec![
        Message::system(build_instructions(previous, context_window)),
        Message::user(format!("Analyze this new content batch:\n{}", batch.join("\n"))),
    ]
}

/// The instruction template with the previous-topics block filled in.
pub fn build_instructions(previous: &[String], context_window: usize) -> String {
    ANALYSIS_INSTRUCTIONS.replace("{previous_topics}", &previous_topics(previous, context_window))
}

/// One `- <first line, 100 chars>...` entry per summary in the context window.
pub fn previous_topics(previous: &[String], context_window: usize) -> String {
    if previous.is_empty() || context_window == 0 {
        return NO_PREVIOUS.to_string();
    }

    let start = previous.len().saturating_sub(context_window);
    previous[start..]
        .iter()
        .map(|analysis| {
            let first_line = analysis.lines().next().unwrap_or("");
            let preview: String = first_line.chars().take(TOPIC_PREVIEW_CHARS).collect();
            format!("- {}...", preview)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedProvider;

    #[tokio::test]
    async fn test_empty_batch_short_circuits() {
        let provider = Arc::new(ScriptedProvider::new(|_| "should not be used".to_string()));
        let summarizer = Summarizer::new(provider.clone());

        let summary = summarizer.summarize(&[], &["old".to_string()]).await.unwrap();

        assert_eq!(summary, "");
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_summarize_returns_raw_text() {
        let provider = Arc::new(ScriptedProvider::new(|_| "## Key Concepts\n- raw".to_string()));
        let summarizer = Summarizer::new(provider.clone());

        let batch = vec!["point one".to_string(), "point two".to_string()];
        let summary = summarizer.summarize(&batch, &[]).await.unwrap();

        assert_eq!(summary, "## Key Concepts\n- raw");
        let calls = provider.calls();
        assert_eq!(calls[0][1].content, "Analyze this new content batch:\npoint one\npoint two");
        assert!(calls[0][0].content.contains("Previous Summary Topics:\nNo previous analyses"));
    }

    #[test]
    fn test_previous_topics_window() {
        let previous: Vec<String> = (1..=7).map(|i| format!("Summary {}\nbody", i)).collect();
        let topics = previous_topics(&previous, CONTEXT_WINDOW);
        let lines: Vec<&str> = topics.lines().collect();

        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0], "- Summary 3...");
        assert_eq!(lines[4], "- Summary 7...");
    }

    #[test]
    fn test_previous_topics_truncates_first_line() {
        let long = format!("{}\nsecond line", "é".repeat(150));
        let topics = previous_topics(&[long], CONTEXT_WINDOW);

        assert_eq!(topics, format!("- {}...", "é".repeat(100)));
    }

    #[test]
    fn test_instructions_fill_placeholder() {
        let instructions = build_instructions(&[], CONTEXT_WINDOW);
        assert!(!instructions.contains("{previous_topics}"));
        assert!(instructions.contains("No previous analyses"));
    }

    #[test]
    fn test_instructions_request_quick_summary_heading() {
        let instructions = build_instructions(&[], CONTEXT_WINDOW);
        assert!(instructions.starts_with("Create a comprehensive and detailed summary"));
        assert!(instructions.contains("- Use a \"### 5-Minute Summary\" heading for quick review\n"));
        assert!(instructions.ends_with("Current Content Analysis:\n"));
    }
}
