//! Summary rendering.
//!
//! Markdown is first parsed into a small story model ([`document`]), which
//! the PDF writer lays out and narration flattens to plain text.

pub mod document;
pub mod markdown;
pub mod pdf;

pub use document::{Alignment, Block, Document, Inline, Table};
pub use markdown::render;
pub use pdf::{markdown_file_to_pdf, write_pdf};
