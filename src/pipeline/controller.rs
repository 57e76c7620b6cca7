//! Run Controller
//!
//! Owns a whole analysis run for one PDF: resume or reset, plan the page
//! ranges (test batch first, then the remainder), run them, write the final
//! summary and drop the checkpoint.

use super::processor::{Pipeline, RangeProcessor, RangeStatus};
use super::state::RunState;
use crate::source::{PageSource, PdfPages};
use crate::store::{BookLayout, BookStores, SummaryKind};
use anyhow::Result;
use std::ops::Range;
use std::path::{Path, PathBuf};

/// How a run ended.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// All pages processed; the checkpoint has been removed.
    Completed {
        final_summary: String,
        final_path: Option<PathBuf>,
        state: RunState,
    },
    /// Cancelled by the user; the checkpoint is the resume point.
    Stopped { state: RunState },
    /// A page failed; the checkpoint is the resume point.
    Failed {
        page: usize,
        message: String,
        state: RunState,
    },
}

pub struct RunController {
    pipeline: Pipeline,
    base_dir: PathBuf,
}

impl RunController {
    pub fn new(pipeline: Pipeline, base_dir: impl Into<PathBuf>) -> Self {
        Self {
            pipeline,
            base_dir: base_dir.into(),
        }
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Analyze `pdf`, copying it into the analysis directory first if needed.
    ///
    /// `test_pages <= 0` disables the test batch; `interval <= 0` disables
    /// interval summaries.
    pub async fn run(&self, pdf: &Path, test_pages: i64, interval: i64) -> Result<RunOutcome> {
        let layout = BookLayout::new(&self.base_dir, pdf);
        layout.ensure_dirs()?;
        let pdf_path = layout.import_pdf(pdf)?;
        let mut source = PdfPages::open(&pdf_path)?;

        self.run_with_source(layout, &mut source, test_pages, interval)
            .await
    }

    /// Run against an already opened page source.
    pub async fn run_with_source(
        &self,
        layout: BookLayout,
        source: &mut dyn PageSource,
        test_pages: i64,
        interval: i64,
    ) -> Result<RunOutcome> {
        let reporter = &self.pipeline.reporter;
        layout.ensure_dirs()?;
        let stores = BookStores::new(layout);

        let (mut state, resume_start) = match stores.checkpoints.load()? {
            Some(checkpoint) => {
                let resume = checkpoint.resume_page();
                reporter.info(format!("Resuming from page {}", resume + 1));
                (checkpoint.into_state(), resume)
            }
            None => {
                let removed = stores.layout.reset_artifacts()?;
                if removed > 0 {
                    reporter.info(format!("Starting fresh: removed {} old files", removed));
                }
                (RunState::default(), 0)
            }
        };

        let total = source.page_count();
        let limit = usize::try_from(test_pages).ok().filter(|l| *l > 0);
        let interval = usize::try_from(interval).ok().filter(|i| *i > 0);
        reporter.info(format!("Book has {} pages", total));

        let processor = RangeProcessor::new(&self.pipeline, &stores, interval);
        for pages in plan_ranges(total, limit, resume_start) {
            reporter.info(format!("Processing pages {} to {}", pages.start + 1, pages.end));
            let outcome = processor.process(source, pages, state).await?;
            state = outcome.state;

            match outcome.status {
                RangeStatus::Completed => {}
                RangeStatus::Stopped { .. } => return Ok(RunOutcome::Stopped { state }),
                RangeStatus::Failed { page, message } => {
                    return Ok(RunOutcome::Failed {
                        page,
                        message,
                        state,
                    })
                }
            }
        }

        reporter.info("Generating final analysis...");
        let final_summary = self
            .pipeline
            .summarizer
            .summarize(&state.knowledge_base, &state.previous_analyses)
            .await?;
        let final_path = stores.summaries.save(SummaryKind::Final, &final_summary)?;
        if let Some(path) = &final_path {
            reporter.info(format!("Saved final analysis to {}", path.display()));
        }

        if stores.checkpoints.clear()? {
            reporter.info("Analysis complete, progress checkpoint removed");
        }
        reporter.progress(100.0);

        Ok(RunOutcome::Completed {
            final_summary,
            final_path,
            state,
        })
    }
}

/// Page ranges still to process, in order, skipping empty ones.
///
/// With a test limit below `total` the run is split at the limit; a resume
/// point past the limit goes straight to the remainder.
pub fn plan_ranges(total: usize, limit: Option<usize>, resume_start: usize) -> Vec<Range<usize>> {
    let mut ranges = Vec::new();
    match limit {
        Some(limit) if limit < total => {
            if resume_start < limit {
                ranges.push(resume_start..limit);
            }
            ranges.push(limit.max(resume_start)..total);
        }
        _ => ranges.push(resume_start..total),
    }
    ranges.retain(|r| !r.is_empty());
    ranges
}
