//! Run state carried between pages, ranges and resumes.

use serde::{Deserialize, Serialize};

/// Everything a run accumulates. Passed by value into the range processor
/// and handed back with its outcome.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunState {
    /// Knowledge points in discovery order.
    pub knowledge_base: Vec<String>,
    /// Every summary generated so far, oldest first.
    pub previous_analyses: Vec<String>,
    /// Index into `knowledge_base` of the first point not yet summarized.
    pub last_analysis_count: usize,
}

impl RunState {
    /// Knowledge gathered since the last interval summary.
    pub fn unsummarized(&self) -> &[String] {
        let from = self.last_analysis_count.min(self.knowledge_base.len());
        &self.knowledge_base[from..]
    }

    /// Record an interval summary and move the watermark to the end.
    pub fn record_summary(&mut self, summary: String) {
        self.previous_analyses.push(summary);
        self.last_analysis_count = self.knowledge_base.len();
    }
}
