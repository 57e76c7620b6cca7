//! Markdown → [`Document`] with pulldown-cmark.
//!
//! Only the subset the summarizer produces is modelled: headings, bullet
//! lists, pipe tables, emphasis, inline code, links, fenced code and rules.
//! Anything else degrades to paragraphs of text.

use super::document::{push_inline, Alignment, Block, Cell, Document, Inline, Table};
use log::debug;
use pulldown_cmark::{Alignment as MdAlignment, Event, Options, Parser, Tag, TagEnd};

/// Parse `markdown` into a story model titled `title`.
pub fn render(markdown: &str, title: &str) -> Document {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);

    let mut builder = Builder::default();
    for event in Parser::new_ext(markdown, options) {
        builder.event(event);
    }

    Document {
        title: title.to_string(),
        blocks: builder.blocks,
    }
}

#[derive(Default)]
struct TableBuilder {
    alignments: Vec<Alignment>,
    header: Vec<Cell>,
    rows: Vec<Vec<Cell>>,
    row: Vec<Cell>,
}

#[derive(Default)]
struct Builder {
    blocks: Vec<Block>,
    inlines: Vec<Inline>,
    bold: usize,
    italic: usize,
    link: Option<String>,
    heading: Option<u8>,
    list_depth: usize,
    table: Option<TableBuilder>,
    code_block: Option<String>,
}

impl Builder {
    fn event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Text(text) => {
                if let Some(code) = self.code_block.as_mut() {
                    code.push_str(&text);
                } else {
                    self.text(&text, false);
                }
            }
            Event::Code(text) => self.text(&text, true),
            Event::Html(html) | Event::InlineHtml(html) => self.text(&html, false),
            Event::SoftBreak | Event::HardBreak => self.text(" ", false),
            Event::Rule => {
                self.flush_paragraph();
                self.blocks.push(Block::Rule);
            }
            _ => {}
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Heading { level, .. } => {
                self.flush_paragraph();
                self.heading = Some(level as u8);
            }
            Tag::Paragraph => {
                // a second paragraph inside a list item continues the item
                if self.list_depth > 0 && !self.inlines.is_empty() {
                    self.text(" ", false);
                }
            }
            Tag::List(_) => {
                self.flush_item();
                self.list_depth += 1;
            }
            Tag::Strong => self.bold += 1,
            Tag::Emphasis => self.italic += 1,
            Tag::Link { dest_url, .. } => self.link = Some(dest_url.to_string()),
            Tag::CodeBlock(_) => {
                self.flush_paragraph();
                self.code_block = Some(String::new());
            }
            Tag::Table(alignments) => {
                self.flush_paragraph();
                self.table = Some(TableBuilder {
                    alignments: alignments.into_iter().map(convert_alignment).collect(),
                    ..Default::default()
                });
            }
            Tag::TableHead | Tag::TableRow => {
                if let Some(table) = &mut self.table {
                    table.row.clear();
                }
            }
            _ => {}
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Heading(_) => {
                let inlines = std::mem::take(&mut self.inlines);
                let level = self.heading.take().unwrap_or(1);
                if !inlines.is_empty() {
                    self.blocks.push(Block::Heading { level, inlines });
                }
            }
            TagEnd::Paragraph => {
                if self.list_depth == 0 {
                    self.flush_paragraph();
                }
            }
            TagEnd::Item => self.flush_item(),
            TagEnd::List(_) => {
                self.flush_item();
                self.list_depth = self.list_depth.saturating_sub(1);
            }
            TagEnd::Strong => self.bold = self.bold.saturating_sub(1),
            TagEnd::Emphasis => self.italic = self.italic.saturating_sub(1),
            TagEnd::Link => self.link = None,
            TagEnd::CodeBlock => {
                if let Some(code) = self.code_block.take() {
                    self.blocks.push(Block::Code(code.trim_end_matches('\n').to_string()));
                }
            }
            TagEnd::TableCell => {
                let cell = std::mem::take(&mut self.inlines);
                if let Some(table) = &mut self.table {
                    table.row.push(cell);
                }
            }
            TagEnd::TableHead => {
                if let Some(table) = &mut self.table {
                    table.header = std::mem::take(&mut table.row);
                }
            }
            TagEnd::TableRow => {
                if let Some(table) = &mut self.table {
                    let row = std::mem::take(&mut table.row);
                    table.rows.push(row);
                }
            }
            TagEnd::Table => {
                if let Some(table) = self.table.take() {
                    if table.rows.is_empty() {
                        debug!("skipping table without data rows");
                    } else {
                        self.blocks.push(Block::Table(Table {
                            alignments: table.alignments,
                            header: table.header,
                            rows: table.rows,
                        }));
                    }
                }
            }
            _ => {}
        }
    }

    fn text(&mut self, text: &str, code: bool) {
        push_inline(
            &mut self.inlines,
            Inline {
                text: text.to_string(),
                bold: self.bold > 0,
                italic: self.italic > 0,
                code,
                link: self.link.clone(),
            },
        );
    }

    fn flush_paragraph(&mut self) {
        if self.list_depth > 0 {
            self.flush_item();
            return;
        }
        let inlines = std::mem::take(&mut self.inlines);
        if inlines.iter().any(|i| !i.text.trim().is_empty()) {
            self.blocks.push(Block::Paragraph(inlines));
        }
    }

    fn flush_item(&mut self) {
        if self.list_depth == 0 {
            return;
        }
        let inlines = std::mem::take(&mut self.inlines);
        if inlines.iter().any(|i| !i.text.trim().is_empty()) {
            self.blocks.push(Block::ListItem {
                depth: self.list_depth - 1,
                inlines,
            });
        }
    }
}

fn convert_alignment(alignment: MdAlignment) -> Alignment {
    match alignment {
        MdAlignment::Center => Alignment::Center,
        MdAlignment::Right => Alignment::Right,
        MdAlignment::None | MdAlignment::Left => Alignment::Left,
    }
}
