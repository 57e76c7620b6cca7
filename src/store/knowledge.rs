//! Knowledge Store: the JSON mirror of the in-memory knowledge base.
//!
//! Shape: `{"knowledge": ["point", ...]}`, insertion order = discovery order.

use super::write_atomic;
use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Serialize)]
struct KnowledgeFileRef<'a> {
    knowledge: &'a [String],
}

#[derive(Deserialize)]
struct KnowledgeFile {
    knowledge: Vec<String>,
}

/// JSON knowledge base file for one book.
#[derive(Debug, Clone)]
pub struct KnowledgeStore {
    path: PathBuf,
}

impl KnowledgeStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the file with the given knowledge points.
    pub fn save(&self, knowledge: &[String]) -> Result<()> {
        debug!("saving knowledge base ({} items) to {:?}", knowledge.len(), self.path);
        let json = serde_json::to_vec_pretty(&KnowledgeFileRef { knowledge })
            .context("Failed to serialize knowledge base")?;
        write_atomic(&self.path, &json)
    }

    /// Load the knowledge points, or an empty list when the file doesn't exist.
    pub fn load(&self) -> Result<Vec<String>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read knowledge base {:?}", self.path))?;
        let file: KnowledgeFile = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse knowledge base {:?}", self.path))?;
        Ok(file.knowledge)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_save_shape() {
        let dir = tempdir().unwrap();
        let store = KnowledgeStore::new(dir.path().join("book_knowledge.json"));

        store
            .save(&["Entropy never decreases".to_string(), "Heat flows downhill".to_string()])
            .unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(
            raw,
            serde_json::json!({"knowledge": ["Entropy never decreases", "Heat flows downhill"]})
        );
        assert_eq!(store.load().unwrap().len(), 2);
    }

    #[test]
    fn test_load_missing_is_empty() {
        let dir = tempdir().unwrap();
        let store = KnowledgeStore::new(dir.path().join("none_knowledge.json"));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_empty_knowledge_still_written() {
        let dir = tempdir().unwrap();
        let store = KnowledgeStore::new(dir.path().join("blank_knowledge.json"));

        store.save(&[]).unwrap();

        assert!(store.path().exists());
        assert!(store.load().unwrap().is_empty());
    }
}
