//! Page-Range Processor
//!
//! Walks pages `[start, end)` of a book: extract, classify, grow the
//! knowledge base, emit interval summaries, and checkpoint after every page.
//! A failure in any step of a page ends the range without an error: the
//! state and knowledge file roll back to the last completed page, whose
//! checkpoint stays the resume point.

use super::cancel::CancelToken;
use super::progress::Reporter;
use super::state::RunState;
use crate::analysis::{PageClassifier, Summarizer};
use crate::source::PageSource;
use crate::store::{BookStores, Checkpoint, SummaryKind};
use anyhow::Result;
use std::ops::Range;
use std::sync::Arc;

/// The collaborators every stage of a run needs.
pub struct Pipeline {
    pub classifier: Arc<dyn PageClassifier>,
    pub summarizer: Summarizer,
    pub reporter: Reporter,
    pub cancel: CancelToken,
}

/// How a range ended.
#[derive(Debug, Clone, PartialEq)]
pub enum RangeStatus {
    /// Every page in the range was processed.
    Completed,
    /// The cancel token was set before `next_page` started.
    Stopped { next_page: usize },
    /// A step of `page` failed; nothing of it was kept.
    Failed { page: usize, message: String },
}

/// State after the range plus how it ended.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeOutcome {
    pub state: RunState,
    pub status: RangeStatus,
}

/// Runs one page range against a book's stores.
pub struct RangeProcessor<'a> {
    pipeline: &'a Pipeline,
    stores: &'a BookStores,
    interval: Option<usize>,
}

impl<'a> RangeProcessor<'a> {
    /// `interval` of `None` or `Some(0)` disables interval summaries.
    pub fn new(pipeline: &'a Pipeline, stores: &'a BookStores, interval: Option<usize>) -> Self {
        Self {
            pipeline,
            stores,
            interval: interval.filter(|i| *i > 0),
        }
    }

    pub async fn process(
        &self,
        source: &mut dyn PageSource,
        pages: Range<usize>,
        mut state: RunState,
    ) -> Result<RangeOutcome> {
        let reporter = &self.pipeline.reporter;
        let span = pages.len();

        for page in pages.clone() {
            if self.pipeline.cancel.is_cancelled() {
                reporter.info(format!("Analysis stopped before page {}", page + 1));
                return Ok(RangeOutcome {
                    state,
                    status: RangeStatus::Stopped { next_page: page },
                });
            }

            reporter.progress((page - pages.start + 1) as f64 / span as f64 * 100.0);

            match self.process_page(source, page, pages.end, state.clone()).await {
                Ok(next) => state = next,
                Err(e) => {
                    let message = format!("{:#}", e);
                    reporter.error(format!("Error processing page {}: {}", page + 1, message));
                    // the knowledge file may already hold this page's points
                    self.stores.knowledge.save(&state.knowledge_base)?;
                    return Ok(RangeOutcome {
                        state,
                        status: RangeStatus::Failed { page, message },
                    });
                }
            }
        }

        Ok(RangeOutcome {
            state,
            status: RangeStatus::Completed,
        })
    }

    /// Extract, classify, persist, summarize if due and checkpoint one page.
    async fn process_page(
        &self,
        source: &mut dyn PageSource,
        page: usize,
        range_end: usize,
        mut state: RunState,
    ) -> Result<RunState> {
        let reporter = &self.pipeline.reporter;
        let text = source.page_text(page)?;
        let content = self.pipeline.classifier.classify(&text).await?;

        if content.has_content {
            let knowledge = content.into_knowledge();
            reporter.info(format!(
                "Found {} new knowledge points on page {}",
                knowledge.len(),
                page + 1
            ));
            state.knowledge_base.extend(knowledge);
        } else {
            reporter.info(format!("Skipping page {} (no relevant content)", page + 1));
        }
        self.stores.knowledge.save(&state.knowledge_base)?;

        if let Some(interval) = self.interval {
            if is_interval_boundary(page, interval, range_end) {
                self.interval_summary(page, &mut state).await?;
            }
        }

        self.stores.checkpoints.save(&Checkpoint::new(page, &state))?;
        Ok(state)
    }

    async fn interval_summary(&self, page: usize, state: &mut RunState) -> Result<()> {
        let reporter = &self.pipeline.reporter;
        reporter.info(format!("Generating interval analysis at page {}", page + 1));

        let summary = self
            .pipeline
            .summarizer
            .summarize(state.unsummarized(), &state.previous_analyses)
            .await?;
        if let Some(path) = self.stores.summaries.save(SummaryKind::Interval, &summary)? {
            reporter.info(format!("Saved interval analysis to {}", path.display()));
        }
        state.record_summary(summary);
        Ok(())
    }
}

/// Whether an interval summary is due after 0-based `page`.
///
/// The last page of a range never triggers one; the final summary covers it.
pub fn is_interval_boundary(page: usize, interval: usize, range_end: usize) -> bool {
    interval > 0 && (page + 1) % interval == 0 && page + 1 != range_end
}
