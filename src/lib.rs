//! lectern: page-by-page PDF study notes.
//!
//! A run walks a PDF one page at a time, asks an LLM whether each page
//! teaches something, grows a JSON knowledge base, and writes interval and
//! final markdown study summaries. Runs checkpoint after every page and
//! resume exactly where they stopped. Summaries can be rendered to PDF
//! ([`render`]) and narrated to MP3 ([`speech`]).

pub mod analysis;
pub mod config;
pub mod error;
pub mod llm;
pub mod pipeline;
pub mod render;
pub mod source;
pub mod speech;
pub mod store;
pub mod worker;

pub use analysis::{LlmClassifier, PageClassifier, PageContent, Summarizer};
pub use config::{suggest_settings, Config, Suggested};
pub use error::AnalysisError;
pub use pipeline::{CancelToken, Pipeline, Reporter, RunController, RunOutcome, RunState};
pub use source::{PageSource, PdfPages};
pub use store::{BookLayout, BookStores, SummaryKind};
pub use worker::{WorkerHandle, WorkerResult};

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted doubles for the external collaborators.

    use crate::analysis::{PageClassifier, PageContent};
    use crate::error::AnalysisError;
    use crate::llm::{CompletionResponse, LLMProvider, Message, ModelMetadata};
    use crate::source::PageSource;
    use anyhow::Result;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    type Reply = Box<dyn Fn(&[Message]) -> String + Send + Sync>;

    /// LLM double answering from a closure and recording every request.
    pub struct ScriptedProvider {
        reply: Reply,
        calls: Mutex<Vec<Vec<Message>>>,
    }

    impl ScriptedProvider {
        pub fn new(reply: impl Fn(&[Message]) -> String + Send + Sync + 'static) -> Self {
            Self {
                reply: Box::new(reply),
                calls: Mutex::new(Vec::new()),
            }
        }

        /// Answers `## Summary 1`, `## Summary 2`, ...
        pub fn summaries() -> Self {
            let counter = AtomicUsize::new(0);
            Self::new(move |_| format!("## Summary {}", counter.fetch_add(1, Ordering::SeqCst) + 1))
        }

        pub fn calls(&self) -> Vec<Vec<Message>> {
            self.calls.lock().unwrap().clone()
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl LLMProvider for ScriptedProvider {
        fn metadata(&self) -> ModelMetadata {
            ModelMetadata {
                id: "scripted".to_string(),
                context_window: 128_000,
            }
        }

        async fn completion(&self, messages: &[Message]) -> Result<CompletionResponse> {
            self.calls.lock().unwrap().push(messages.to_vec());
            Ok(CompletionResponse::text((self.reply)(messages)))
        }
    }

    type Verdict = Box<dyn Fn(&str) -> Result<PageContent> + Send + Sync>;

    /// Classifier double deciding from the page text.
    pub struct ScriptedClassifier {
        verdict: Verdict,
    }

    impl ScriptedClassifier {
        pub fn new(verdict: impl Fn(&str) -> Result<PageContent> + Send + Sync + 'static) -> Self {
            Self {
                verdict: Box::new(verdict),
            }
        }

        /// One knowledge point per page: `point from <page text>`.
        pub fn one_point_per_page() -> Self {
            Self::new(|text| Ok(PageContent::with_knowledge(vec![format!("point from {}", text)])))
        }
    }

    #[async_trait]
    impl PageClassifier for ScriptedClassifier {
        async fn classify(&self, page_text: &str) -> Result<PageContent> {
            (self.verdict)(page_text)
        }
    }

    /// In-memory book; page `i` reads `page {i + 1}`.
    pub struct MemoryPages {
        pages: Vec<String>,
        failing: Option<usize>,
    }

    impl MemoryPages {
        pub fn numbered(count: usize) -> Self {
            Self {
                pages: (1..=count).map(|n| format!("page {}", n)).collect(),
                failing: None,
            }
        }

        /// Make extraction of 0-based `page` fail.
        pub fn failing_on(mut self, page: usize) -> Self {
            self.failing = Some(page);
            self
        }
    }

    impl PageSource for MemoryPages {
        fn page_count(&self) -> usize {
            self.pages.len()
        }

        fn page_text(&mut self, index: usize) -> Result<String> {
            if self.failing == Some(index) {
                return Err(AnalysisError::Extraction {
                    page: index,
                    message: "scripted failure".to_string(),
                }
                .into());
            }
            self.pages.get(index).cloned().ok_or_else(|| {
                AnalysisError::PageOutOfRange {
                    page: index,
                    total: self.pages.len(),
                }
                .into()
            })
        }
    }
}
