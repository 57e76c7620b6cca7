//! Error taxonomy for analysis runs.
//!
//! Input errors abort a run before any page is touched. Per-page failures are
//! not errors at the run level: the page-range processor reports them as a
//! stopped range so the checkpoint stays usable for a resume.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("PDF file {0:?} not found")]
    PdfNotFound(PathBuf),

    #[error("Failed to read PDF {path:?}: {message}")]
    PdfUnreadable { path: PathBuf, message: String },

    #[error("Page {page} out of range (document has {total} pages)")]
    PageOutOfRange { page: usize, total: usize },

    #[error("Failed to extract text from page {page}: {message}")]
    Extraction { page: usize, message: String },

    #[error("OPENAI_API_KEY environment variable not set")]
    MissingApiKey,

    #[error("Invalid LLM response: {0}")]
    InvalidResponse(String),

    #[error("Nothing to narrate in {0:?}")]
    EmptyNarration(PathBuf),
}
