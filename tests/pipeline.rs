//! End-to-end runs of the analysis pipeline against scripted collaborators.

use anyhow::Result;
use async_trait::async_trait;
use lectern::llm::{CompletionResponse, LLMProvider, Message, ModelMetadata};
use lectern::pipeline::{CancelToken, Pipeline, Reporter, RunController, RunOutcome};
use lectern::store::{BookLayout, BookStores, SummaryKind};
use lectern::{PageClassifier, PageContent, PageSource, Summarizer};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::tempdir;

/// Summaries derived only from the request, so equal inputs give equal outputs.
#[derive(Default)]
struct DigestLlm {
    requests: Mutex<Vec<String>>,
}

#[async_trait]
impl LLMProvider for DigestLlm {
    fn metadata(&self) -> ModelMetadata {
        ModelMetadata {
            id: "digest".to_string(),
            context_window: 128_000,
        }
    }

    async fn completion(&self, messages: &[Message]) -> Result<CompletionResponse> {
        let batch = &messages[1].content;
        self.requests.lock().unwrap().push(batch.clone());
        let points = batch.lines().count() - 1;
        Ok(CompletionResponse::text(format!(
            "## Digest of {} points ({} prompt chars)\n\n### 5-Minute Summary\n- {}",
            points,
            messages[0].content.len(),
            batch.lines().last().unwrap_or("")
        )))
    }
}

/// Every third page is front matter; the rest yield two points.
/// Optionally cancels a token while classifying one page.
struct BookClassifier {
    calls: AtomicUsize,
    cancel_on: Mutex<Option<(String, CancelToken)>>,
}

impl BookClassifier {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            cancel_on: Mutex::new(None),
        }
    }

    fn cancelling_on(page_text: &str, token: CancelToken) -> Self {
        let classifier = Self::new();
        *classifier.cancel_on.lock().unwrap() = Some((page_text.to_string(), token));
        classifier
    }
}

#[async_trait]
impl PageClassifier for BookClassifier {
    async fn classify(&self, page_text: &str) -> Result<PageContent> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some((trigger, token)) = self.cancel_on.lock().unwrap().as_ref() {
            if trigger == page_text {
                token.cancel();
            }
        }

        let number: usize = page_text.trim_start_matches("page ").parse()?;
        if number % 3 == 0 {
            return Ok(PageContent::skip());
        }
        Ok(PageContent::with_knowledge(vec![
            format!("{} / idea", page_text),
            format!("{} / example", page_text),
        ]))
    }
}

struct Book {
    pages: usize,
    broken_page: Option<usize>,
}

impl PageSource for Book {
    fn page_count(&self) -> usize {
        self.pages
    }

    fn page_text(&mut self, index: usize) -> Result<String> {
        if self.broken_page == Some(index) {
            anyhow::bail!("unreadable page");
        }
        Ok(format!("page {}", index + 1))
    }
}

fn controller(base: &Path, classifier: Arc<BookClassifier>, llm: Arc<DigestLlm>, cancel: CancelToken) -> RunController {
    let pipeline = Pipeline {
        classifier,
        summarizer: Summarizer::new(llm),
        reporter: Reporter::quiet(),
        cancel,
    };
    RunController::new(pipeline, base)
}

fn layout(base: &Path) -> BookLayout {
    BookLayout::new(base, Path::new("course.pdf"))
}

#[tokio::test]
async fn test_full_run_with_test_batch_and_intervals() {
    let dir = tempdir().unwrap();
    let llm = Arc::new(DigestLlm::default());
    let run = controller(dir.path(), Arc::new(BookClassifier::new()), llm.clone(), CancelToken::new());
    let mut book = Book {
        pages: 7,
        broken_page: None,
    };

    let outcome = run
        .run_with_source(layout(dir.path()), &mut book, 3, 2)
        .await
        .unwrap();

    let RunOutcome::Completed {
        final_summary,
        final_path,
        state,
    } = outcome
    else {
        panic!("run did not complete");
    };

    // pages 3 and 6 are skipped
    assert_eq!(state.knowledge_base.len(), 10);
    // boundaries after pages 2, 4 and 6; page 3 and 7 end their ranges
    assert_eq!(state.previous_analyses.len(), 3);
    assert_eq!(state.last_analysis_count, 8);
    assert!(final_summary.starts_with("## Digest of 10 points"));

    let stores = BookStores::new(layout(dir.path()));
    assert_eq!(stores.summaries.list(SummaryKind::Interval).unwrap().len(), 3);
    let final_path = final_path.unwrap();
    assert!(final_path.ends_with("course_final_001.md"));
    let saved = std::fs::read_to_string(&final_path).unwrap();
    assert!(saved.starts_with("# Book Analysis: course.pdf\n"));
    assert!(!stores.checkpoints.exists());
    assert_eq!(stores.knowledge.load().unwrap(), state.knowledge_base);
    assert_eq!(llm.requests.lock().unwrap().len(), 4);
}

#[tokio::test]
async fn test_interrupted_run_resumes_to_same_result() {
    let straight_dir = tempdir().unwrap();
    let straight_llm = Arc::new(DigestLlm::default());
    let straight = controller(
        straight_dir.path(),
        Arc::new(BookClassifier::new()),
        straight_llm.clone(),
        CancelToken::new(),
    );
    let mut book = Book {
        pages: 10,
        broken_page: None,
    };
    let expected = straight
        .run_with_source(layout(straight_dir.path()), &mut book, 4, 3)
        .await
        .unwrap();

    let dir = tempdir().unwrap();
    let llm = Arc::new(DigestLlm::default());
    let cancel = CancelToken::new();
    let first_classifier = Arc::new(BookClassifier::cancelling_on("page 5", cancel.clone()));
    let first = controller(dir.path(), first_classifier.clone(), llm.clone(), cancel);
    let stopped = first
        .run_with_source(layout(dir.path()), &mut book, 4, 3)
        .await
        .unwrap();
    assert!(matches!(stopped, RunOutcome::Stopped { .. }));
    assert_eq!(first_classifier.calls.load(Ordering::SeqCst), 5);

    let stores = BookStores::new(layout(dir.path()));
    let checkpoint = stores.checkpoints.load().unwrap().unwrap();
    assert_eq!(checkpoint.last_page, 4);

    let second_classifier = Arc::new(BookClassifier::new());
    let second = controller(dir.path(), second_classifier.clone(), llm.clone(), CancelToken::new());
    let resumed = second
        .run_with_source(layout(dir.path()), &mut book, 4, 3)
        .await
        .unwrap();

    // pages 1-5 are never classified again
    assert_eq!(second_classifier.calls.load(Ordering::SeqCst), 5);
    assert_eq!(resumed, expected_with_path(&expected, &resumed));
    assert_eq!(*llm.requests.lock().unwrap(), *straight_llm.requests.lock().unwrap());
    assert_eq!(
        stores.summaries.list(SummaryKind::Interval).unwrap().len(),
        BookStores::new(layout(straight_dir.path()))
            .summaries
            .list(SummaryKind::Interval)
            .unwrap()
            .len()
    );
    assert!(!stores.checkpoints.exists());
}

/// `expected` with its final path swapped for the one in `actual`, since the
/// two runs write to different directories.
fn expected_with_path(expected: &RunOutcome, actual: &RunOutcome) -> RunOutcome {
    match (expected, actual) {
        (
            RunOutcome::Completed {
                final_summary,
                state,
                ..
            },
            RunOutcome::Completed { final_path, .. },
        ) => RunOutcome::Completed {
            final_summary: final_summary.clone(),
            final_path: final_path.clone(),
            state: state.clone(),
        },
        _ => panic!("both runs should complete"),
    }
}

#[tokio::test]
async fn test_cancel_before_start_touches_nothing() {
    let dir = tempdir().unwrap();
    let llm = Arc::new(DigestLlm::default());
    let classifier = Arc::new(BookClassifier::new());
    let cancel = CancelToken::new();
    cancel.cancel();
    let run = controller(dir.path(), classifier.clone(), llm.clone(), cancel);
    let mut book = Book {
        pages: 5,
        broken_page: None,
    };

    let outcome = run
        .run_with_source(layout(dir.path()), &mut book, 0, 0)
        .await
        .unwrap();

    assert_eq!(
        outcome,
        RunOutcome::Stopped {
            state: Default::default()
        }
    );
    assert_eq!(classifier.calls.load(Ordering::SeqCst), 0);
    assert!(llm.requests.lock().unwrap().is_empty());
    let stores = BookStores::new(layout(dir.path()));
    assert!(!stores.checkpoints.exists());
    assert!(stores.summaries.list(SummaryKind::Final).unwrap().is_empty());
}

#[tokio::test]
async fn test_failed_page_is_resume_point() {
    let dir = tempdir().unwrap();
    let llm = Arc::new(DigestLlm::default());
    let mut book = Book {
        pages: 6,
        broken_page: Some(3),
    };

    let run = controller(dir.path(), Arc::new(BookClassifier::new()), llm.clone(), CancelToken::new());
    let outcome = run
        .run_with_source(layout(dir.path()), &mut book, 0, 0)
        .await
        .unwrap();

    match outcome {
        RunOutcome::Failed { page, state, .. } => {
            assert_eq!(page, 3);
            // pages 1 and 2 carry knowledge, page 3 is front matter
            assert_eq!(state.knowledge_base.len(), 4);
        }
        other => panic!("expected failure, got {:?}", other),
    }
    let stores = BookStores::new(layout(dir.path()));
    assert_eq!(stores.checkpoints.load().unwrap().unwrap().resume_page(), 3);
    assert!(llm.requests.lock().unwrap().is_empty());

    book.broken_page = None;
    let retry = controller(dir.path(), Arc::new(BookClassifier::new()), llm.clone(), CancelToken::new());
    let outcome = retry
        .run_with_source(layout(dir.path()), &mut book, 0, 0)
        .await
        .unwrap();

    match outcome {
        RunOutcome::Completed { state, .. } => assert_eq!(state.knowledge_base.len(), 8),
        other => panic!("expected completion, got {:?}", other),
    }
    assert_eq!(llm.requests.lock().unwrap().len(), 1);
}
