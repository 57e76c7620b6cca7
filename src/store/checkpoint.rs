//! Progress Checkpoint: the durable snapshot that makes a run resumable.
//!
//! Written after every successfully processed page, read once at run start,
//! deleted after the final summary is saved. Encoded with bincode.

use super::write_atomic;
use crate::pipeline::RunState;
use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use log::debug;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Snapshot of a run after `last_page` (0-based) completed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub last_page: usize,
    pub knowledge_base: Vec<String>,
    pub previous_analyses: Vec<String>,
    pub last_analysis_count: usize,
    pub timestamp: DateTime<Local>,
}

impl Checkpoint {
    pub fn new(last_page: usize, state: &RunState) -> Self {
        Self {
            last_page,
            knowledge_base: state.knowledge_base.clone(),
            previous_analyses: state.previous_analyses.clone(),
            last_analysis_count: state.last_analysis_count,
            timestamp: Local::now(),
        }
    }

    /// First page that still needs processing.
    pub fn resume_page(&self) -> usize {
        self.last_page + 1
    }

    pub fn into_state(self) -> RunState {
        RunState {
            knowledge_base: self.knowledge_base,
            previous_analyses: self.previous_analyses,
            last_analysis_count: self.last_analysis_count,
        }
    }
}

/// Checkpoint file for one book.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    path: PathBuf,
}

impl CheckpointStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    pub fn save(&self, checkpoint: &Checkpoint) -> Result<()> {
        let bytes = bincode::serialize(checkpoint).context("Failed to encode checkpoint")?;
        write_atomic(&self.path, &bytes)?;
        debug!("progress saved at page {}", checkpoint.last_page + 1);
        Ok(())
    }

    pub fn load(&self) -> Result<Option<Checkpoint>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let bytes = std::fs::read(&self.path)
            .with_context(|| format!("Failed to read checkpoint {:?}", self.path))?;
        let checkpoint = bincode::deserialize(&bytes)
            .with_context(|| format!("Failed to decode checkpoint {:?}", self.path))?;
        Ok(Some(checkpoint))
    }

    /// Remove the checkpoint. Returns whether one existed.
    pub fn clear(&self) -> Result<bool> {
        if !self.path.exists() {
            return Ok(false);
        }
        std::fs::remove_file(&self.path)
            .with_context(|| format!("Failed to remove checkpoint {:?}", self.path))?;
        Ok(true)
    }
}
