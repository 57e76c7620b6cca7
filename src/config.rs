//! Configuration management for lectern
//!
//! Holds model selection, output location and run defaults, persisted as
//! TOML at `~/.lectern/config.toml`. The API key is never stored here; it
//! comes from `OPENAI_API_KEY` (optionally via a `.env` file).

use crate::analysis::CONTEXT_WINDOW;
use crate::llm::OPENAI_API_BASE;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// lectern configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding `pdfs/`, `knowledge_bases/`, `summaries/`, `progress/`
    pub base_dir: PathBuf,
    /// PDF analyzed when none is given on the command line
    pub default_pdf: String,
    /// OpenAI-compatible API base URL
    pub api_base: String,
    /// Model used to classify pages
    pub page_model: String,
    /// Model used to write summaries
    pub summary_model: String,
    /// Text-to-speech model
    pub speech_model: String,
    /// Text-to-speech voice
    pub voice: String,
    /// Pages in the first (test) batch; 0 processes the whole book at once
    pub test_pages: i64,
    /// Pages between interval summaries; 0 disables them
    pub interval: i64,
    /// Previous summaries shown to the summarizer
    pub context_window: usize,
    /// Version of config schema (for future migrations)
    pub version: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("book_analysis"),
            default_pdf: "dllm.pdf".to_string(),
            api_base: OPENAI_API_BASE.to_string(),
            page_model: "gpt-4o-mini".to_string(),
            summary_model: "gpt-4o-mini".to_string(),
            speech_model: "tts-1".to_string(),
            voice: "alloy".to_string(),
            test_pages: 60,
            interval: 20,
            context_window: CONTEXT_WINDOW,
            version: 1,
        }
    }
}

impl Config {
    /// Get the config file path (~/.lectern/config.toml)
    pub fn path() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Could not determine home directory")?;
        Ok(home.join(".lectern").join("config.toml"))
    }

    /// Load config from disk, or return None if it doesn't exist
    pub fn load() -> Result<Option<Self>> {
        let path = Self::path()?;
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {:?}", path))?;
        Ok(Some(config))
    }

    /// Load config from disk, falling back to defaults on first run
    pub fn load_or_default() -> Result<Self> {
        Ok(Self::load()?.unwrap_or_default())
    }

    /// Save config to disk
    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::path()?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(&path, content).context("Failed to write config file")?;

        Ok(path)
    }
}

/// Test-batch size and interval suggested for a book.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Suggested {
    /// `None` when the whole book is processed in one range
    pub test_pages: Option<usize>,
    pub interval: usize,
}

/// Suggested settings for a book of `total_pages`.
///
/// In test mode the first batch is a third of the book (at most 60 pages)
/// with a summary every third of that (at most 20); otherwise a summary every
/// tenth of the book (at most 20).
pub fn suggest_settings(total_pages: usize, test_mode: bool) -> Suggested {
    if test_mode {
        let test_pages = (total_pages / 3).min(60);
        Suggested {
            test_pages: Some(test_pages),
            interval: (test_pages / 3).min(20),
        }
    } else {
        Suggested {
            test_pages: None,
            interval: (total_pages / 10).min(20),
        }
    }
}
