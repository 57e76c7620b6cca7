//! Summary records: numbered markdown files per kind per book.

use super::layout::BookLayout;
use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use log::info;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Which batch a summary covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryKind {
    /// Knowledge gathered since the previous summary
    Interval,
    /// The whole knowledge base at the end of a run
    Final,
}

impl SummaryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Interval => "interval",
            Self::Final => "final",
        }
    }
}

/// Summary files of one book.
#[derive(Debug, Clone)]
pub struct SummaryStore {
    layout: BookLayout,
}

impl SummaryStore {
    pub fn new(layout: &BookLayout) -> Self {
        Self {
            layout: layout.clone(),
        }
    }

    /// Existing summary files of `kind`, sorted by name.
    pub fn list(&self, kind: SummaryKind) -> Result<Vec<PathBuf>> {
        let pattern = self.layout.summary_glob(kind);
        let mut paths = Vec::new();
        for entry in glob::glob(&pattern).context("Invalid summary pattern")? {
            let path = entry?;
            if self.layout.summary_number(kind, &path).is_some() {
                paths.push(path);
            }
        }
        paths.sort();
        Ok(paths)
    }

    /// Next sequence number for `kind`.
    ///
    /// Count of existing files + 1, bumped past the highest number on disk so a
    /// deleted file never causes an existing number to be reused.
    pub fn next_number(&self, kind: SummaryKind) -> Result<usize> {
        let existing = self.list(kind)?;
        let highest = existing
            .iter()
            .filter_map(|p| self.layout.summary_number(kind, p))
            .max()
            .unwrap_or(0);
        Ok(existing.len().max(highest) + 1)
    }

    /// Write `summary` as the next record of `kind`.
    ///
    /// Empty summaries are skipped and return `None`.
    pub fn save(&self, kind: SummaryKind, summary: &str) -> Result<Option<PathBuf>> {
        if summary.trim().is_empty() {
            info!("Skipping summary save: no content to save");
            return Ok(None);
        }

        let number = self.next_number(kind)?;
        let path = self.layout.summary_path(kind, number);
        let content = format_summary(self.layout.pdf_name(), summary, Local::now());

        let mut tmp = tempfile::NamedTempFile::new_in(self.layout.summaries_dir())
            .context("Failed to create temp summary file")?;
        tmp.write_all(content.as_bytes())?;
        tmp.persist_noclobber(&path)
            .map_err(|e| e.error)
            .with_context(|| format!("Failed to write summary {:?}", path))?;

        info!("Saved {} analysis to: {}", kind.as_str(), path.display());
        Ok(Some(path))
    }

    /// Most recently modified final summary, if any.
    pub fn latest_final(&self) -> Result<Option<PathBuf>> {
        let mut newest: Option<(std::time::SystemTime, PathBuf)> = None;
        for path in self.list(SummaryKind::Final)? {
            let modified = std::fs::metadata(&path)?.modified()?;
            if newest.as_ref().map_or(true, |(t, _)| modified >= *t) {
                newest = Some((modified, path));
            }
        }
        Ok(newest.map(|(_, p)| p))
    }
}

/// Summary markdown with header and footer.
pub fn format_summary(pdf_name: &str, summary: &str, generated_at: DateTime<Local>) -> String {
    format!(
        "# Book Analysis: {}\nGenerated on: {}\n\n{}\n\n---\n*Analysis generated using AI Book Analysis Tool*\n",
        pdf_name,
        generated_at.format("%Y-%m-%d %H:%M:%S"),
        summary
    )
}

/// Lines of the `### 5-Minute Summary` section, trimmed and non-empty.
pub fn quick_summary(markdown: &str) -> Vec<String> {
    markdown
        .lines()
        .skip_while(|line| !line.starts_with("### 5-Minute Summary"))
        .skip(1)
        .take_while(|line| !line.starts_with("###"))
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect()
}

/// Sibling of a summary with another extension (`.pdf`, `.mp3`).
pub fn companion_path(summary: &Path, extension: &str) -> PathBuf {
    summary.with_extension(extension)
}
