//! LLM-backed analysis stages.
//!
//! - [`classifier`]: decides whether a page is worth studying and extracts
//!   knowledge points from it
//! - [`summarizer`]: turns a batch of knowledge points into a markdown study
//!   guide, with the last few summaries as context

pub mod classifier;
pub mod summarizer;

pub use classifier::{LlmClassifier, PageClassifier, PageContent};
pub use summarizer::{Summarizer, CONTEXT_WINDOW};
