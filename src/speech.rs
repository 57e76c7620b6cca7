//! Narration: summary markdown → MP3.
//!
//! The markdown is flattened through the render story model, split into
//! sentence-aligned chunks that fit the speech service's input cap, and the
//! synthesized MP3 segments are concatenated into one file.

use crate::error::AnalysisError;
use crate::llm::OPENAI_API_BASE;
use crate::pipeline::Reporter;
use crate::render::render;
use crate::store::write_atomic;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Input cap of the OpenAI speech endpoint, in characters.
pub const MAX_SPEECH_CHARS: usize = 4096;

/// Turns text into encoded audio.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Longest input accepted by one `synthesize` call, in characters.
    fn max_input_chars(&self) -> usize {
        MAX_SPEECH_CHARS
    }

    /// Synthesize `text` into MP3 bytes.
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>>;
}

/// OpenAI-compatible `/audio/speech` client.
pub struct OpenAISpeech {
    client: Client,
    api_key: String,
    api_base: String,
    model: String,
    voice: String,
}

#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    input: &'a str,
    voice: &'a str,
    response_format: &'a str,
}

impl OpenAISpeech {
    pub fn new(api_key: String, model: String, voice: String) -> Self {
        Self::with_base(api_key, OPENAI_API_BASE.to_string(), model, voice)
    }

    pub fn with_base(api_key: String, api_base: String, model: String, voice: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            api_base: api_base.trim_end_matches('/').to_string(),
            model,
            voice,
        }
    }

    /// Build a client using the `OPENAI_API_KEY` environment variable.
    pub fn from_env(api_base: &str, model: &str, voice: &str) -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| AnalysisError::MissingApiKey)?;
        Ok(Self::with_base(
            api_key,
            api_base.to_string(),
            model.to_string(),
            voice.to_string(),
        ))
    }

    fn endpoint(&self) -> String {
        format!("{}/audio/speech", self.api_base)
    }
}

#[async_trait]
impl SpeechSynthesizer for OpenAISpeech {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        let request = SpeechRequest {
            model: &self.model,
            input: text,
            voice: &self.voice,
            response_format: "mp3",
        };

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .context("Failed to send request to OpenAI speech")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("OpenAI speech error ({}): {}", status, error_text));
        }

        let bytes = response
            .bytes()
            .await
            .context("Failed to read speech audio")?;
        Ok(bytes.to_vec())
    }
}

/// Split `text` into chunks of at most `max_chars` characters, preferring
/// sentence boundaries, then word boundaries.
pub fn split_for_speech(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for sentence in sentences(text) {
        for piece in fit_pieces(&sentence, max_chars) {
            let piece_len = piece.chars().count();
            let separator = usize::from(current_len > 0);
            if current_len + separator + piece_len > max_chars && current_len > 0 {
                chunks.push(std::mem::take(&mut current));
                current_len = 0;
            }
            if current_len > 0 {
                current.push(' ');
                current_len += 1;
            }
            current.push_str(&piece);
            current_len += piece_len;
        }
    }

    if current_len > 0 {
        chunks.push(current);
    }
    chunks
}

/// Sentences with whitespace collapsed. A sentence ends at `.`, `!` or `?`
/// followed by whitespace, or at a blank line.
fn sentences(text: &str) -> Vec<String> {
    let mut result = Vec::new();
    for paragraph in text.split("\n\n") {
        let words: Vec<&str> = paragraph.split_whitespace().collect();
        let mut sentence: Vec<&str> = Vec::new();
        for word in words {
            sentence.push(word);
            if word.ends_with(['.', '!', '?']) {
                result.push(sentence.join(" "));
                sentence.clear();
            }
        }
        if !sentence.is_empty() {
            result.push(sentence.join(" "));
        }
    }
    result
}

/// Break a sentence longer than `max_chars` at word boundaries, and a word
/// longer than `max_chars` anywhere.
fn fit_pieces(sentence: &str, max_chars: usize) -> Vec<String> {
    if sentence.chars().count() <= max_chars {
        return vec![sentence.to_string()];
    }

    let mut pieces = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;
    for word in sentence.split(' ') {
        let chars: Vec<char> = word.chars().collect();
        for part in chars.chunks(max_chars) {
            let part: String = part.iter().collect();
            let part_len = part.chars().count();
            if current_len > 0 && current_len + 1 + part_len > max_chars {
                pieces.push(std::mem::take(&mut current));
                current_len = 0;
            }
            if current_len > 0 {
                current.push(' ');
                current_len += 1;
            }
            current.push_str(&part);
            current_len += part_len;
        }
    }
    if current_len > 0 {
        pieces.push(current);
    }
    pieces
}

/// Narrate a markdown file into `<stem>.mp3` next to it.
pub async fn narrate(
    markdown_path: &Path,
    synthesizer: &dyn SpeechSynthesizer,
    reporter: &Reporter,
) -> Result<PathBuf> {
    let markdown = std::fs::read_to_string(markdown_path)
        .with_context(|| format!("Failed to read {:?}", markdown_path))?;
    let title = markdown_path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let text = render(&markdown, &title).plain_text();
    if text.trim().is_empty() {
        return Err(AnalysisError::EmptyNarration(markdown_path.to_path_buf()).into());
    }

    let chunks = split_for_speech(&text, synthesizer.max_input_chars());
    reporter.info(format!("Converting text to speech ({} segments)...", chunks.len()));

    let mut audio = Vec::new();
    for (i, chunk) in chunks.iter().enumerate() {
        let segment = synthesizer
            .synthesize(chunk)
            .await
            .with_context(|| format!("Failed to synthesize segment {} of {}", i + 1, chunks.len()))?;
        audio.extend_from_slice(&segment);
        reporter.progress((i + 1) as f64 / chunks.len() as f64 * 100.0);
    }

    let output = markdown_path.with_extension("mp3");
    write_atomic(&output, &audio)?;
    reporter.info(format!("Audio saved to: {}", output.display()));
    Ok(output)
}
