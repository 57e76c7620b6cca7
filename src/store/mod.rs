//! On-disk artifacts for one book.
//!
//! Every book is identified by its PDF file stem. Its knowledge base,
//! checkpoint and summaries live in sibling directories under a base dir
//! (see [`layout::BookLayout`]). Knowledge and checkpoint writes replace the
//! whole file through a temp file + rename, so a reader never sees a torn file.

pub mod checkpoint;
pub mod knowledge;
pub mod layout;
pub mod summaries;

pub use checkpoint::{Checkpoint, CheckpointStore};
pub use knowledge::KnowledgeStore;
pub use layout::BookLayout;
pub use summaries::{SummaryKind, SummaryStore};

use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;

/// The stores of one book, built from its layout.
#[derive(Debug, Clone)]
pub struct BookStores {
    pub layout: BookLayout,
    pub knowledge: KnowledgeStore,
    pub checkpoints: CheckpointStore,
    pub summaries: SummaryStore,
}

impl BookStores {
    pub fn new(layout: BookLayout) -> Self {
        Self {
            knowledge: KnowledgeStore::new(layout.knowledge_path()),
            checkpoints: CheckpointStore::new(layout.checkpoint_path()),
            summaries: SummaryStore::new(&layout),
            layout,
        }
    }
}

/// Replace `path` with `bytes` in one rename.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("No parent directory for {:?}", path))?;

    let mut tmp = tempfile::NamedTempFile::new_in(parent)
        .with_context(|| format!("Failed to create temp file in {:?}", parent))?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path)
        .map_err(|e| e.error)
        .with_context(|| format!("Failed to replace {:?}", path))?;

    Ok(())
}
