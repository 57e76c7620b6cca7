//! Page Extractor
//!
//! A `PageSource` yields the text of one page at a time so the pipeline never
//! holds a whole book in memory. `PdfPages` is backed by `pdf_oxide`.

use crate::error::AnalysisError;
use anyhow::Result;
use log::debug;
use pdf_oxide::document::PdfDocument;
use std::path::{Path, PathBuf};

/// Random access to page text, 0-based.
pub trait PageSource {
    /// Total number of pages.
    fn page_count(&self) -> usize;

    /// Extract the text of one page.
    fn page_text(&mut self, index: usize) -> Result<String>;
}

/// PDF page source using pdf_oxide text extraction.
pub struct PdfPages {
    path: PathBuf,
    document: PdfDocument,
    total: usize,
}

impl PdfPages {
    /// Open a PDF and read its page count.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(AnalysisError::PdfNotFound(path.to_path_buf()).into());
        }

        let unreadable = |e: &dyn std::fmt::Display| AnalysisError::PdfUnreadable {
            path: path.to_path_buf(),
            message: e.to_string(),
        };

        let mut document = PdfDocument::open(path).map_err(|e| unreadable(&e))?;
        let total = document.page_count().map_err(|e| unreadable(&e))?;
        debug!("opened {:?}: {} pages", path, total);

        Ok(Self {
            path: path.to_path_buf(),
            document,
            total,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PageSource for PdfPages {
    fn page_count(&self) -> usize {
        self.total
    }

    fn page_text(&mut self, index: usize) -> Result<String> {
        if index >= self.total {
            return Err(AnalysisError::PageOutOfRange {
                page: index,
                total: self.total,
            }
            .into());
        }

        self.document.extract_text(index).map_err(|e| {
            AnalysisError::Extraction {
                page: index + 1,
                message: e.to_string(),
            }
            .into()
        })
    }
}

/// Count pages without keeping the document open.
pub fn page_count(path: &Path) -> Result<usize> {
    Ok(PdfPages::open(path)?.page_count())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_pdf_is_input_error() {
        let dir = tempdir().unwrap();
        let err = PdfPages::open(&dir.path().join("missing.pdf")).err().unwrap();

        assert!(matches!(
            err.downcast_ref::<AnalysisError>(),
            Some(AnalysisError::PdfNotFound(_))
        ));
    }

    #[test]
    fn test_garbage_pdf_is_unreadable() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.pdf");
        std::fs::write(&path, b"not a valid pdf").unwrap();

        assert!(PdfPages::open(&path).is_err());
    }
}
