//! Story model shared by the PDF writer and narration.

/// A run of text with uniform styling.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Inline {
    pub text: String,
    pub bold: bool,
    pub italic: bool,
    pub code: bool,
    pub link: Option<String>,
}

impl Inline {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    fn same_style(&self, other: &Inline) -> bool {
        self.bold == other.bold
            && self.italic == other.italic
            && self.code == other.code
            && self.link == other.link
    }
}

/// Column alignment of a table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Alignment {
    #[default]
    Left,
    Center,
    Right,
}

/// One table cell: a sequence of inline runs.
pub type Cell = Vec<Inline>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub alignments: Vec<Alignment>,
    pub header: Vec<Cell>,
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn columns(&self) -> usize {
        self.rows
            .iter()
            .map(Vec::len)
            .chain(std::iter::once(self.header.len()))
            .chain(std::iter::once(self.alignments.len()))
            .max()
            .unwrap_or(0)
    }

    pub fn alignment(&self, column: usize) -> Alignment {
        self.alignments.get(column).copied().unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Heading { level: u8, inlines: Vec<Inline> },
    Paragraph(Vec<Inline>),
    /// A bullet; `depth` is 0 for top-level items.
    ListItem { depth: usize, inlines: Vec<Inline> },
    Table(Table),
    Rule,
    Code(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    pub title: String,
    pub blocks: Vec<Block>,
}

impl Document {
    /// Text of the document with styling dropped, one block per paragraph.
    pub fn plain_text(&self) -> String {
        let mut parts = Vec::new();
        for block in &self.blocks {
            let text = match block {
                Block::Heading { inlines, .. } | Block::Paragraph(inlines) => join_inlines(inlines),
                Block::ListItem { inlines, .. } => join_inlines(inlines),
                Block::Table(table) => table
                    .rows
                    .iter()
                    .map(|row| row.iter().map(|c| join_inlines(c)).collect::<Vec<_>>().join(", "))
                    .collect::<Vec<_>>()
                    .join("\n"),
                Block::Code(code) => code.clone(),
                Block::Rule => continue,
            };
            let text = text.trim();
            if !text.is_empty() {
                parts.push(text.to_string());
            }
        }
        parts.join("\n\n")
    }
}

/// Concatenated text of a run sequence.
pub fn join_inlines(inlines: &[Inline]) -> String {
    inlines.iter().map(|i| i.text.as_str()).collect()
}

/// Append `run`, merging it into the previous run when the style matches.
pub fn push_inline(inlines: &mut Vec<Inline>, run: Inline) {
    if run.text.is_empty() {
        return;
    }
    match inlines.last_mut() {
        Some(last) if last.same_style(&run) => last.text.push_str(&run.text),
        _ => inlines.push(run),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_inline_merges_same_style() {
        let mut runs = Vec::new();
        push_inline(&mut runs, Inline::plain("a "));
        push_inline(&mut runs, Inline::plain("b"));
        push_inline(
            &mut runs,
            Inline {
                text: "c".into(),
                bold: true,
                ..Default::default()
            },
        );
        push_inline(&mut runs, Inline::plain(""));

        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].text, "a b");
        assert!(runs[1].bold);
    }

    #[test]
    fn test_plain_text_skips_rules() {
        let doc = Document {
            title: "t".into(),
            blocks: vec![
                Block::Heading {
                    level: 1,
                    inlines: vec![Inline::plain("Intro")],
                },
                Block::Rule,
                Block::ListItem {
                    depth: 0,
                    inlines: vec![Inline::plain("point")],
                },
            ],
        };
        assert_eq!(doc.plain_text(), "Intro\n\npoint");
    }
}
