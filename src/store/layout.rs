//! Directory layout and per-book file naming.
//!
//! ```text
//! <base>/pdfs/<name>.pdf
//! <base>/knowledge_bases/<stem>_knowledge.json
//! <base>/summaries/<stem>_{interval,final}_NNN.md
//! <base>/progress/<stem>_progress.bin
//! ```

use super::summaries::SummaryKind;
use crate::error::AnalysisError;
use anyhow::{Context, Result};
use log::{debug, info};
use std::path::{Path, PathBuf};

pub const PDF_DIR: &str = "pdfs";
pub const KNOWLEDGE_DIR: &str = "knowledge_bases";
pub const SUMMARIES_DIR: &str = "summaries";
pub const PROGRESS_DIR: &str = "progress";

/// Where one book's artifacts live.
#[derive(Debug, Clone, PartialEq)]
pub struct BookLayout {
    base_dir: PathBuf,
    pdf_name: String,
    stem: String,
}

impl BookLayout {
    /// Layout for `pdf` (only its file name is used) under `base_dir`.
    pub fn new(base_dir: impl Into<PathBuf>, pdf: &Path) -> Self {
        let pdf_name = pdf
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let stem = pdf
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();

        Self {
            base_dir: base_dir.into(),
            pdf_name,
            stem,
        }
    }

    /// File name of the PDF, e.g. `dllm.pdf`.
    pub fn pdf_name(&self) -> &str {
        &self.pdf_name
    }

    /// Identity of the book: the PDF file stem.
    pub fn stem(&self) -> &str {
        &self.stem
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn pdf_dir(&self) -> PathBuf {
        self.base_dir.join(PDF_DIR)
    }

    pub fn knowledge_dir(&self) -> PathBuf {
        self.base_dir.join(KNOWLEDGE_DIR)
    }

    pub fn summaries_dir(&self) -> PathBuf {
        self.base_dir.join(SUMMARIES_DIR)
    }

    pub fn progress_dir(&self) -> PathBuf {
        self.base_dir.join(PROGRESS_DIR)
    }

    /// Working copy of the PDF inside the base dir.
    pub fn pdf_path(&self) -> PathBuf {
        self.pdf_dir().join(&self.pdf_name)
    }

    pub fn knowledge_path(&self) -> PathBuf {
        self.knowledge_dir().join(format!("{}_knowledge.json", self.stem))
    }

    pub fn checkpoint_path(&self) -> PathBuf {
        self.progress_dir().join(format!("{}_progress.bin", self.stem))
    }

    pub fn summary_path(&self, kind: SummaryKind, number: usize) -> PathBuf {
        self.summaries_dir()
            .join(format!("{}_{}_{:03}.md", self.stem, kind.as_str(), number))
    }

    /// Glob for summary files of `kind`.
    ///
    /// Also matches books whose stem extends this one (`notes` vs
    /// `notes_final`); filter hits with [`Self::summary_number`].
    pub fn summary_glob(&self, kind: SummaryKind) -> String {
        self.summary_pattern(kind, ".md")
    }

    /// Sequence number of `path` if it is a summary of `kind` for this book.
    ///
    /// Any extension is accepted so rendered and narrated companions match too.
    pub fn summary_number(&self, kind: SummaryKind, path: &Path) -> Option<usize> {
        let name = path.file_stem()?.to_str()?;
        let digits = name.strip_prefix(format!("{}_{}_", self.stem, kind.as_str()).as_str())?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse().ok()
    }

    fn summary_pattern(&self, kind: SummaryKind, suffix: &str) -> String {
        format!(
            "{}/{}_{}_*{}",
            glob::Pattern::escape(&self.summaries_dir().to_string_lossy()),
            glob::Pattern::escape(&self.stem),
            kind.as_str(),
            suffix
        )
    }

    /// Create every directory the pipeline writes to.
    pub fn ensure_dirs(&self) -> Result<()> {
        for dir in [
            self.pdf_dir(),
            self.knowledge_dir(),
            self.summaries_dir(),
            self.progress_dir(),
        ] {
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create directory {:?}", dir))?;
        }
        Ok(())
    }

    /// Delete knowledge and summary artifacts of this book (not other books).
    ///
    /// Returns the number of files removed.
    pub fn reset_artifacts(&self) -> Result<usize> {
        let knowledge = format!(
            "{}/{}_knowledge.*",
            glob::Pattern::escape(&self.knowledge_dir().to_string_lossy()),
            glob::Pattern::escape(&self.stem)
        );

        let mut doomed = Vec::new();
        for entry in glob::glob(&knowledge).context("Invalid artifact pattern")? {
            doomed.push(entry?);
        }
        for kind in [SummaryKind::Interval, SummaryKind::Final] {
            for entry in glob::glob(&self.summary_pattern(kind, "")).context("Invalid artifact pattern")? {
                let path = entry?;
                if self.summary_number(kind, &path).is_some() {
                    doomed.push(path);
                }
            }
        }

        let mut removed = 0;
        for path in doomed {
            if path.is_file() {
                std::fs::remove_file(&path)
                    .with_context(|| format!("Failed to remove {:?}", path))?;
                debug!("removed {:?}", path);
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Make sure the working copy of the PDF exists, copying `source` in if needed.
    pub fn import_pdf(&self, source: &Path) -> Result<PathBuf> {
        let target = self.pdf_path();
        if target.exists() {
            return Ok(target);
        }
        if !source.exists() {
            return Err(AnalysisError::PdfNotFound(source.to_path_buf()).into());
        }

        std::fs::copy(source, &target)
            .with_context(|| format!("Failed to copy {:?} to {:?}", source, target))?;
        info!("Copied PDF to analysis directory: {}", target.display());
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_paths() {
        let layout = BookLayout::new("book_analysis", Path::new("/tmp/books/dllm.pdf"));

        assert_eq!(layout.pdf_name(), "dllm.pdf");
        assert_eq!(layout.stem(), "dllm");
        assert_eq!(
            layout.knowledge_path(),
            PathBuf::from("book_analysis/knowledge_bases/dllm_knowledge.json")
        );
        assert_eq!(
            layout.checkpoint_path(),
            PathBuf::from("book_analysis/progress/dllm_progress.bin")
        );
        assert_eq!(
            layout.summary_path(SummaryKind::Final, 7),
            PathBuf::from("book_analysis/summaries/dllm_final_007.md")
        );
    }

    #[test]
    fn test_reset_only_touches_own_book() {
        let dir = tempdir().unwrap();
        let layout = BookLayout::new(dir.path(), Path::new("book.pdf"));
        let other = BookLayout::new(dir.path(), Path::new("book_two.pdf"));
        layout.ensure_dirs().unwrap();

        std::fs::write(layout.knowledge_path(), "{}").unwrap();
        std::fs::write(layout.summary_path(SummaryKind::Interval, 1), "a").unwrap();
        std::fs::write(layout.summary_path(SummaryKind::Final, 1), "b").unwrap();
        std::fs::write(other.knowledge_path(), "{}").unwrap();
        std::fs::write(other.summary_path(SummaryKind::Final, 1), "c").unwrap();

        assert_eq!(layout.reset_artifacts().unwrap(), 3);
        assert!(!layout.knowledge_path().exists());
        assert!(other.knowledge_path().exists());
        assert!(other.summary_path(SummaryKind::Final, 1).exists());
    }

    #[test]
    fn test_reset_spares_book_with_longer_stem() {
        let dir = tempdir().unwrap();
        let notes = BookLayout::new(dir.path(), Path::new("notes.pdf"));
        let notes_final = BookLayout::new(dir.path(), Path::new("notes_final.pdf"));
        notes.ensure_dirs().unwrap();

        let own = notes.summary_path(SummaryKind::Final, 1);
        let own_pdf = own.with_extension("pdf");
        let theirs = notes_final.summary_path(SummaryKind::Final, 1);
        let theirs_interval = notes_final.summary_path(SummaryKind::Interval, 2);
        for path in [&own, &own_pdf, &theirs, &theirs_interval] {
            std::fs::write(path, "x").unwrap();
        }

        assert_eq!(notes.reset_artifacts().unwrap(), 2);
        assert!(!own.exists());
        assert!(!own_pdf.exists());
        assert!(theirs.exists());
        assert!(theirs_interval.exists());
    }

    #[test]
    fn test_summary_number() {
        let layout = BookLayout::new("base", Path::new("notes.pdf"));

        assert_eq!(
            layout.summary_number(SummaryKind::Final, Path::new("notes_final_012.md")),
            Some(12)
        );
        assert_eq!(
            layout.summary_number(SummaryKind::Final, Path::new("notes_final_1000.mp3")),
            Some(1000)
        );
        assert_eq!(
            layout.summary_number(SummaryKind::Final, Path::new("notes_final_final_001.md")),
            None
        );
        assert_eq!(
            layout.summary_number(SummaryKind::Interval, Path::new("notes_final_001.md")),
            None
        );
    }

    #[test]
    fn test_import_pdf() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("novel.pdf");
        std::fs::write(&source, b"%PDF-1.4").unwrap();

        let layout = BookLayout::new(dir.path().join("analysis"), &source);
        layout.ensure_dirs().unwrap();
        let copied = layout.import_pdf(&source).unwrap();

        assert_eq!(copied, layout.pdf_path());
        assert!(copied.exists());
        assert!(source.exists());
    }

    #[test]
    fn test_import_missing_pdf() {
        let dir = tempdir().unwrap();
        let layout = BookLayout::new(dir.path(), Path::new("ghost.pdf"));
        layout.ensure_dirs().unwrap();

        let err = layout.import_pdf(&dir.path().join("ghost.pdf")).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AnalysisError>(),
            Some(AnalysisError::PdfNotFound(_))
        ));
    }
}
