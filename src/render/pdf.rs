//! Document → PDF with lopdf.
//!
//! A small flowing layout on US-Letter pages using the 14 standard fonts, so
//! nothing has to be embedded. Text is WinAnsi-encoded; characters outside
//! that set are dropped.

use super::document::{Alignment, Block, Cell, Document, Inline, Table};
use super::markdown::render;
use anyhow::{Context, Result};
use chrono::Local;
use log::info;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Object, Stream};
use std::path::{Path, PathBuf};

const PAGE_WIDTH: f32 = 612.0;
const PAGE_HEIGHT: f32 = 792.0;
const MARGIN: f32 = 72.0;
const CONTENT_WIDTH: f32 = PAGE_WIDTH - 2.0 * MARGIN;

const BODY_SIZE: f32 = 11.0;
const CODE_SIZE: f32 = 9.0;
const FOOTER_SIZE: f32 = 9.0;
const LEADING: f32 = 1.35;
const BLOCK_GAP: f32 = 6.0;
const LIST_INDENT: f32 = 18.0;
const CELL_PADDING: f32 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Font {
    Regular,
    Bold,
    Italic,
    BoldItalic,
    Mono,
}

impl Font {
    const ALL: [Font; 5] = [
        Font::Regular,
        Font::Bold,
        Font::Italic,
        Font::BoldItalic,
        Font::Mono,
    ];

    fn for_inline(inline: &Inline) -> Self {
        match (inline.code, inline.bold, inline.italic) {
            (true, _, _) => Font::Mono,
            (false, true, true) => Font::BoldItalic,
            (false, true, false) => Font::Bold,
            (false, false, true) => Font::Italic,
            (false, false, false) => Font::Regular,
        }
    }

    fn resource_name(self) -> &'static str {
        match self {
            Font::Regular => "F1",
            Font::Bold => "F2",
            Font::Italic => "F3",
            Font::BoldItalic => "F4",
            Font::Mono => "F5",
        }
    }

    fn base_name(self) -> &'static str {
        match self {
            Font::Regular => "Helvetica",
            Font::Bold => "Helvetica-Bold",
            Font::Italic => "Helvetica-Oblique",
            Font::BoldItalic => "Helvetica-BoldOblique",
            Font::Mono => "Courier",
        }
    }

    fn emboldened(self) -> Self {
        match self {
            Font::Regular => Font::Bold,
            Font::Italic => Font::BoldItalic,
            other => other,
        }
    }

    /// Approximate advance width of `c` in em units.
    fn char_width(self, c: char) -> f32 {
        if self == Font::Mono {
            return 0.6;
        }
        let base = match c {
            ' ' | 'i' | 'j' | 'l' | '.' | ',' | ':' | ';' | '\'' | '!' | '|' => 0.278,
            'f' | 't' | 'r' | 'I' | '(' | ')' | '[' | ']' | '-' => 0.333,
            'm' | 'w' | 'M' | 'W' | '@' => 0.833,
            'A'..='Z' => 0.667,
            _ => 0.556,
        };
        match self {
            Font::Bold | Font::BoldItalic => base * 1.06,
            _ => base,
        }
    }

    fn text_width(self, text: &str, size: f32) -> f32 {
        text.chars().map(|c| self.char_width(c)).sum::<f32>() * size
    }
}

/// Styled run inside one laid-out line.
#[derive(Debug, Clone, PartialEq)]
struct Run {
    font: Font,
    link: bool,
    text: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Line {
    runs: Vec<Run>,
    width: f32,
}

impl Line {
    fn push(&mut self, font: Font, link: bool, text: &str, size: f32) {
        self.width += font.text_width(text, size);
        match self.runs.last_mut() {
            Some(last) if last.font == font && last.link == link => last.text.push_str(text),
            _ => self.runs.push(Run {
                font,
                link,
                text: text.to_string(),
            }),
        }
    }

    /// Width without trailing spaces, for centring and right alignment.
    fn visible_width(&self, size: f32) -> f32 {
        let trailing: usize = self
            .runs
            .last()
            .map(|r| r.text.len() - r.text.trim_end().len())
            .unwrap_or(0);
        self.width - trailing as f32 * Font::Regular.char_width(' ') * size
    }
}

/// Greedy word wrap of styled runs into lines no wider than `max_width`.
fn wrap(inlines: &[Inline], size: f32, max_width: f32, embolden: bool) -> Vec<Line> {
    let mut lines = Vec::new();
    let mut line = Line::default();

    for inline in inlines {
        let mut font = Font::for_inline(inline);
        if embolden {
            font = font.emboldened();
        }
        let link = inline.link.is_some();

        for word in inline.text.split_inclusive(char::is_whitespace) {
            let word = if word.ends_with(char::is_whitespace) {
                format!("{} ", word.trim_end())
            } else {
                word.to_string()
            };
            let word_width = font.text_width(word.trim_end(), size);
            if !line.runs.is_empty() && line.width + word_width > max_width {
                lines.push(std::mem::take(&mut line));
                let word = word.trim_start();
                if !word.is_empty() {
                    line.push(font, link, word, size);
                }
            } else if !(line.runs.is_empty() && word.trim().is_empty()) {
                line.push(font, link, &word, size);
            }
        }
    }

    if !line.runs.is_empty() {
        lines.push(line);
    }
    lines
}

/// Map text to WinAnsi bytes, dropping what the encoding cannot show.
fn win_ansi(text: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\u{20}'..='\u{7e}' => bytes.push(c as u8),
            '\u{a0}'..='\u{ff}' => bytes.push(c as u32 as u8),
            '€' => bytes.push(0x80),
            '…' => bytes.push(0x85),
            '‘' => bytes.push(0x91),
            '’' => bytes.push(0x92),
            '“' => bytes.push(0x93),
            '”' => bytes.push(0x94),
            '•' => bytes.push(0x95),
            '–' => bytes.push(0x96),
            '—' => bytes.push(0x97),
            '™' => bytes.push(0x99),
            '→' => bytes.extend_from_slice(b"->"),
            '←' => bytes.extend_from_slice(b"<-"),
            '\t' => bytes.push(b' '),
            _ => {}
        }
    }
    bytes
}

fn real(value: f32) -> Object {
    Object::Real(value)
}

/// Lays blocks out top to bottom, breaking pages as needed.
struct Layout {
    pages: Vec<Vec<Operation>>,
    ops: Vec<Operation>,
    y: f32,
}

impl Layout {
    fn new() -> Self {
        Self {
            pages: Vec::new(),
            ops: Vec::new(),
            y: PAGE_HEIGHT - MARGIN,
        }
    }

    fn break_page(&mut self) {
        self.pages.push(std::mem::take(&mut self.ops));
        self.y = PAGE_HEIGHT - MARGIN;
    }

    fn ensure(&mut self, height: f32) {
        if self.y - height < MARGIN && self.y < PAGE_HEIGHT - MARGIN {
            self.break_page();
        }
    }

    fn gap(&mut self, height: f32) {
        self.y -= height;
    }

    fn finish(mut self) -> Vec<Vec<Operation>> {
        self.pages.push(self.ops);
        self.pages
    }

    /// Draw one line with its baseline at the current cursor.
    fn draw_line(&mut self, line: &Line, x: f32, baseline: f32, size: f32) {
        self.ops.push(Operation::new("BT", vec![]));
        self.ops
            .push(Operation::new("Td", vec![real(x), real(baseline)]));
        for run in &line.runs {
            if run.link {
                self.ops.push(Operation::new(
                    "rg",
                    vec![real(0.0), real(0.2), real(0.7)],
                ));
            }
            self.ops.push(Operation::new(
                "Tf",
                vec![run.font.resource_name().into(), real(size)],
            ));
            self.ops.push(Operation::new(
                "Tj",
                vec![Object::string_literal(win_ansi(&run.text))],
            ));
            if run.link {
                self.ops.push(Operation::new("rg", vec![real(0.0), real(0.0), real(0.0)]));
            }
        }
        self.ops.push(Operation::new("ET", vec![]));
    }

    fn text_lines(&mut self, lines: &[Line], x: f32, size: f32) {
        let leading = size * LEADING;
        for line in lines {
            self.ensure(leading);
            self.y -= leading;
            self.draw_line(line, x, self.y + size * 0.3, size);
        }
    }

    fn heading(&mut self, level: u8, inlines: &[Inline]) {
        let size = (16.0 - 2.0 * f32::from(level)).max(9.0);
        let lines = wrap(inlines, size, CONTENT_WIDTH, true);
        self.ensure(size * LEADING * 2.0);
        self.gap(BLOCK_GAP);
        self.text_lines(&lines, MARGIN, size);
        self.gap(BLOCK_GAP / 2.0);
    }

    fn paragraph(&mut self, inlines: &[Inline], size: f32) {
        let lines = wrap(inlines, size, CONTENT_WIDTH, false);
        self.text_lines(&lines, MARGIN, size);
        self.gap(BLOCK_GAP);
    }

    fn list_item(&mut self, depth: usize, inlines: &[Inline]) {
        let indent = LIST_INDENT * (depth as f32 + 1.0);
        let lines = wrap(inlines, BODY_SIZE, CONTENT_WIDTH - indent, false);
        let Some((first, rest)) = lines.split_first() else {
            return;
        };

        let leading = BODY_SIZE * LEADING;
        self.ensure(leading);
        self.y -= leading;
        let baseline = self.y + BODY_SIZE * 0.3;
        let mut bullet = Line::default();
        bullet.push(Font::Regular, false, "•", BODY_SIZE);
        self.draw_line(&bullet, MARGIN + indent - 10.0, baseline, BODY_SIZE);
        self.draw_line(first, MARGIN + indent, baseline, BODY_SIZE);

        self.text_lines(rest, MARGIN + indent, BODY_SIZE);
        self.gap(2.0);
    }

    fn rule(&mut self) {
        self.ensure(BLOCK_GAP * 2.0);
        self.gap(BLOCK_GAP);
        self.ops.push(Operation::new("w", vec![real(0.5)]));
        self.ops
            .push(Operation::new("m", vec![real(MARGIN), real(self.y)]));
        self.ops.push(Operation::new(
            "l",
            vec![real(PAGE_WIDTH - MARGIN), real(self.y)],
        ));
        self.ops.push(Operation::new("S", vec![]));
        self.gap(BLOCK_GAP);
    }

    fn code(&mut self, code: &str) {
        let per_line = ((CONTENT_WIDTH - 12.0) / (0.6 * CODE_SIZE)).max(1.0) as usize;
        let mut lines = Vec::new();
        for source_line in code.lines() {
            let chars: Vec<char> = source_line.chars().collect();
            if chars.is_empty() {
                lines.push(Line::default());
            }
            for chunk in chars.chunks(per_line) {
                let mut line = Line::default();
                line.push(Font::Mono, false, &chunk.iter().collect::<String>(), CODE_SIZE);
                lines.push(line);
            }
        }
        self.text_lines(&lines, MARGIN + 12.0, CODE_SIZE);
        self.gap(BLOCK_GAP);
    }

    fn table_row(&mut self, cells: &[Cell], alignments: &[Alignment], column_width: f32, header: bool) {
        let wrapped: Vec<Vec<Line>> = (0..alignments.len())
            .map(|i| {
                cells
                    .get(i)
                    .map(|c| wrap(c, BODY_SIZE, column_width - 2.0 * CELL_PADDING, header))
                    .unwrap_or_default()
            })
            .collect();
        let leading = BODY_SIZE * LEADING;
        let line_count = wrapped.iter().map(Vec::len).max().unwrap_or(0).max(1);
        let height = line_count as f32 * leading + 2.0 * CELL_PADDING;

        self.ensure(height);
        let top = self.y;
        let bottom = top - height;

        for (i, lines) in wrapped.iter().enumerate() {
            let x = MARGIN + i as f32 * column_width;
            if header {
                self.ops.push(Operation::new("g", vec![real(0.85)]));
                self.ops.push(Operation::new(
                    "re",
                    vec![real(x), real(bottom), real(column_width), real(height)],
                ));
                self.ops.push(Operation::new("f", vec![]));
                self.ops.push(Operation::new("g", vec![real(0.0)]));
            }
            self.ops.push(Operation::new("w", vec![real(0.5)]));
            self.ops.push(Operation::new(
                "re",
                vec![real(x), real(bottom), real(column_width), real(height)],
            ));
            self.ops.push(Operation::new("S", vec![]));

            for (n, line) in lines.iter().enumerate() {
                let width = line.visible_width(BODY_SIZE);
                let offset = match alignments[i] {
                    Alignment::Left => CELL_PADDING,
                    Alignment::Center => (column_width - width) / 2.0,
                    Alignment::Right => column_width - CELL_PADDING - width,
                };
                let baseline = top - CELL_PADDING - (n as f32 + 1.0) * leading + BODY_SIZE * 0.3;
                self.draw_line(line, x + offset, baseline, BODY_SIZE);
            }
        }
        self.y = bottom;
    }

    fn table(&mut self, table: &Table) {
        let columns = table.columns();
        if columns == 0 {
            return;
        }
        let alignments: Vec<Alignment> = (0..columns).map(|i| table.alignment(i)).collect();
        let column_width = CONTENT_WIDTH / columns as f32;

        if !table.header.is_empty() {
            self.table_row(&table.header, &alignments, column_width, true);
        }
        for row in &table.rows {
            self.table_row(row, &alignments, column_width, false);
        }
        self.gap(BLOCK_GAP);
    }

    fn block(&mut self, block: &Block) {
        match block {
            Block::Heading { level, inlines } => self.heading(*level, inlines),
            Block::Paragraph(inlines) => self.paragraph(inlines, BODY_SIZE),
            Block::ListItem { depth, inlines } => self.list_item(*depth, inlines),
            Block::Table(table) => self.table(table),
            Block::Rule => self.rule(),
            Block::Code(code) => self.code(code),
        }
    }
}

/// Lay `document` out and write it to `path`.
pub fn write_pdf(document: &Document, path: &Path) -> Result<()> {
    let mut layout = Layout::new();
    for block in &document.blocks {
        layout.block(block);
    }
    let footer = Inline {
        text: format!("Generated on: {}", Local::now().format("%Y-%m-%d %H:%M:%S")),
        italic: true,
        ..Default::default()
    };
    layout.gap(BLOCK_GAP);
    layout.paragraph(&[footer], FOOTER_SIZE);
    let pages = layout.finish();

    let mut doc = lopdf::Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut fonts = Dictionary::new();
    for font in Font::ALL {
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => font.base_name(),
            "Encoding" => "WinAnsiEncoding",
        });
        fonts.set(font.resource_name(), font_id);
    }
    let resources_id = doc.add_object(dictionary! {
        "Font" => fonts,
    });

    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    for operations in pages {
        let content = Content { operations };
        let encoded = content.encode().context("Failed to encode page content")?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    let pages_dict = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => count,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), real(PAGE_WIDTH), real(PAGE_HEIGHT)],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    let info_id = doc.add_object(dictionary! {
        "Title" => Object::string_literal(win_ansi(&document.title)),
        "Producer" => Object::string_literal("lectern"),
    });
    doc.trailer.set("Root", catalog_id);
    doc.trailer.set("Info", info_id);
    doc.compress();

    doc.save(path)
        .with_context(|| format!("Failed to write PDF {:?}", path))?;
    info!("PDF written: {} ({} pages)", path.display(), count);
    Ok(())
}

/// Render a markdown file to `<stem>.pdf` next to it.
pub fn markdown_file_to_pdf(markdown_path: &Path) -> Result<PathBuf> {
    let markdown = std::fs::read_to_string(markdown_path)
        .with_context(|| format!("Failed to read {:?}", markdown_path))?;
    let title = markdown_path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();

    let document = render(&markdown, &title);
    let output = markdown_path.with_extension("pdf");
    write_pdf(&document, &output)?;
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_win_ansi_mapping() {
        assert_eq!(win_ansi("café → “ok” 🟢"), b"caf\xe9 -> \x93ok\x94 ".to_vec());
    }

    #[test]
    fn test_wrap_respects_width() {
        let text = "lorem ipsum dolor sit amet ".repeat(20);
        let lines = wrap(&[Inline::plain(text)], BODY_SIZE, 200.0, false);

        assert!(lines.len() > 1);
        for line in &lines {
            assert!(line.visible_width(BODY_SIZE) <= 200.0);
            assert!(!line.runs[0].text.starts_with(' '));
        }
    }

    #[test]
    fn test_wrap_keeps_styles_apart() {
        let inlines = vec![
            Inline::plain("plain "),
            Inline {
                text: "strong".into(),
                bold: true,
                ..Default::default()
            },
        ];
        let lines = wrap(&inlines, BODY_SIZE, CONTENT_WIDTH, false);

        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].runs.len(), 2);
        assert_eq!(lines[0].runs[1].font, Font::Bold);
    }

    #[test]
    fn test_markdown_file_to_pdf() {
        let dir = tempdir().unwrap();
        let md_path = dir.path().join("book_final_001.md");
        std::fs::write(
            &md_path,
            "# Book Analysis: book.pdf\n\n**bold** and *italic*\n\n- a\n- b\n\n| A | B |\n|:--|--:|\n| x | y |\n\n---\n",
        )
        .unwrap();

        let pdf_path = markdown_file_to_pdf(&md_path).unwrap();

        assert_eq!(pdf_path, dir.path().join("book_final_001.pdf"));
        let loaded = lopdf::Document::load(&pdf_path).unwrap();
        assert_eq!(loaded.get_pages().len(), 1);
    }

    #[test]
    fn test_long_document_breaks_pages() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("long.pdf");
        let blocks = (0..200)
            .map(|i| Block::Paragraph(vec![Inline::plain(format!("Paragraph number {}", i))]))
            .collect();
        let document = Document {
            title: "long".into(),
            blocks,
        };

        write_pdf(&document, &path).unwrap();

        let loaded = lopdf::Document::load(&path).unwrap();
        assert!(loaded.get_pages().len() > 3);
    }
}
