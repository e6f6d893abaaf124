//! Flat remote document model.
//!
//! A `RemoteDocument` is an ordered sequence of styled paragraphs; there is
//! no nesting, hierarchy is encoded purely through paragraph heading levels.
//! Mutations address the document by character index, the way offset-based
//! document APIs do. `RemoteDocument::apply` is the reference interpreter
//! for those mutations and is shared by every `DocumentStore` backend.
//!
//! Indices count Unicode scalar values. An adapter for an API with UTF-16
//! offsets would translate at its own boundary.

use serde::{Deserialize, Serialize};

fn is_false(b: &bool) -> bool {
    !*b
}

/// A run of text sharing one style.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyledRun {
    pub text: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub bold: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub italic: bool,
}

impl StyledRun {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }
}

/// Paragraph-level styling: heading level 1..6 and/or indentation.
/// `indented` round-trips as a blockquote.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParagraphStyle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading_level: Option<u8>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub indented: bool,
}

impl ParagraphStyle {
    pub fn heading(level: u8) -> Self {
        Self {
            heading_level: Some(level.min(6)),
            indented: false,
        }
    }

    pub fn is_heading(&self) -> bool {
        self.heading_level.is_some()
    }
}

/// One paragraph block of the flat document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paragraph {
    pub runs: Vec<StyledRun>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<ParagraphStyle>,
}

impl Paragraph {
    /// Concatenated run text, without any styling.
    pub fn text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }

    pub fn heading_level(&self) -> Option<u8> {
        self.style.as_ref().and_then(|s| s.heading_level)
    }
}

/// The flat representation of the external document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteDocument {
    pub id: String,
    /// Opaque version token; changes on every remote mutation.
    pub revision: String,
    pub blocks: Vec<Paragraph>,
}

impl RemoteDocument {
    pub fn new(id: impl Into<String>, revision: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            revision: revision.into(),
            blocks: Vec::new(),
        }
    }
}

/// A heading plus the markdown body accumulated beneath it, the unit the
/// pull path writes back to individual local files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub level: u32,
    pub title: String,
    pub content: String,
}

/// One abstract document mutation, addressed by character index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum DocMutation {
    /// Insert unstyled text at `index`; newlines split paragraphs.
    InsertText { index: usize, text: String },
    /// Apply a paragraph style to every paragraph whose terminator falls in
    /// `start..end`.
    SetParagraphStyle {
        start: usize,
        end: usize,
        style: ParagraphStyle,
    },
    /// Apply run styling over the character range `start..end`.
    SetTextStyle {
        start: usize,
        end: usize,
        bold: bool,
        italic: bool,
    },
}

/// Internal character cell used while interpreting mutations.
/// Paragraph style rides on the terminating newline, mirroring how
/// offset-addressed document stores model paragraph boundaries.
#[derive(Clone)]
struct Cell {
    ch: char,
    bold: bool,
    italic: bool,
    para: Option<ParagraphStyle>,
}

impl RemoteDocument {
    /// Apply a batch of mutations to the block sequence.
    ///
    /// Does not touch `revision`; issuing a new revision token is the
    /// document store's job.
    pub fn apply_all(&mut self, ops: &[DocMutation]) {
        let mut cells = self.flatten();
        for op in ops {
            Self::apply_one(&mut cells, op);
        }
        self.blocks = Self::rebuild(cells);
    }

    /// Remove all content.
    pub fn clear(&mut self) {
        self.blocks.clear();
    }

    fn flatten(&self) -> Vec<Cell> {
        let mut cells = Vec::new();
        for block in &self.blocks {
            for run in &block.runs {
                for ch in run.text.chars() {
                    cells.push(Cell {
                        ch,
                        bold: run.bold,
                        italic: run.italic,
                        para: None,
                    });
                }
            }
            cells.push(Cell {
                ch: '\n',
                bold: false,
                italic: false,
                para: block.style.clone(),
            });
        }
        cells
    }

    fn apply_one(cells: &mut Vec<Cell>, op: &DocMutation) {
        match op {
            DocMutation::InsertText { index, text } => {
                let at = (*index).min(cells.len());
                let new: Vec<Cell> = text
                    .chars()
                    .map(|ch| Cell {
                        ch,
                        bold: false,
                        italic: false,
                        para: None,
                    })
                    .collect();
                cells.splice(at..at, new);
            }
            DocMutation::SetParagraphStyle { start, end, style } => {
                let end = (*end).min(cells.len());
                for cell in cells.iter_mut().take(end).skip(*start) {
                    if cell.ch == '\n' {
                        cell.para = Some(style.clone());
                    }
                }
            }
            DocMutation::SetTextStyle {
                start,
                end,
                bold,
                italic,
            } => {
                let end = (*end).min(cells.len());
                for cell in cells.iter_mut().take(end).skip(*start) {
                    if cell.ch != '\n' {
                        cell.bold = *bold;
                        cell.italic = *italic;
                    }
                }
            }
        }
    }

    fn rebuild(cells: Vec<Cell>) -> Vec<Paragraph> {
        let mut blocks = Vec::new();
        let mut runs: Vec<StyledRun> = Vec::new();

        for cell in cells {
            if cell.ch == '\n' {
                blocks.push(Paragraph {
                    runs: std::mem::take(&mut runs),
                    style: cell.para,
                });
                continue;
            }
            match runs.last_mut() {
                Some(run) if run.bold == cell.bold && run.italic == cell.italic => {
                    run.text.push(cell.ch);
                }
                _ => runs.push(StyledRun {
                    text: cell.ch.to_string(),
                    bold: cell.bold,
                    italic: cell.italic,
                }),
            }
        }

        // Unterminated trailing text still forms a paragraph.
        if !runs.is_empty() {
            blocks.push(Paragraph { runs, style: None });
        }
        blocks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_doc() -> RemoteDocument {
        RemoteDocument::new("doc-1", "rev-1")
    }

    #[test]
    fn test_insert_builds_paragraphs() {
        let mut doc = empty_doc();
        doc.apply_all(&[DocMutation::InsertText {
            index: 0,
            text: "Hello\nWorld\n".into(),
        }]);
        assert_eq!(doc.blocks.len(), 2);
        assert_eq!(doc.blocks[0].text(), "Hello");
        assert_eq!(doc.blocks[1].text(), "World");
    }

    #[test]
    fn test_paragraph_style_lands_on_terminator() {
        let mut doc = empty_doc();
        doc.apply_all(&[
            DocMutation::InsertText {
                index: 0,
                text: "Title\nBody\n".into(),
            },
            DocMutation::SetParagraphStyle {
                start: 0,
                end: 6,
                style: ParagraphStyle::heading(1),
            },
        ]);
        assert_eq!(doc.blocks[0].heading_level(), Some(1));
        assert_eq!(doc.blocks[1].heading_level(), None);
    }

    #[test]
    fn test_text_style_splits_runs() {
        let mut doc = empty_doc();
        doc.apply_all(&[
            DocMutation::InsertText {
                index: 0,
                text: "plain bold plain\n".into(),
            },
            DocMutation::SetTextStyle {
                start: 6,
                end: 10,
                bold: true,
                italic: false,
            },
        ]);
        let runs = &doc.blocks[0].runs;
        assert_eq!(runs.len(), 3);
        assert_eq!(runs[0].text, "plain ");
        assert!(!runs[0].bold);
        assert_eq!(runs[1].text, "bold");
        assert!(runs[1].bold);
        assert_eq!(runs[2].text, " plain");
        assert!(!runs[2].bold);
    }

    #[test]
    fn test_adjacent_equal_runs_coalesce() {
        let mut doc = empty_doc();
        doc.blocks.push(Paragraph {
            runs: vec![StyledRun::plain("ab"), StyledRun::plain("cd")],
            style: None,
        });
        doc.apply_all(&[]);
        assert_eq!(doc.blocks[0].runs.len(), 1);
        assert_eq!(doc.blocks[0].runs[0].text, "abcd");
    }

    #[test]
    fn test_insert_clamps_out_of_range_index() {
        let mut doc = empty_doc();
        doc.apply_all(&[DocMutation::InsertText {
            index: 500,
            text: "x\n".into(),
        }]);
        assert_eq!(doc.blocks.len(), 1);
        assert_eq!(doc.blocks[0].text(), "x");
    }

    #[test]
    fn test_mutation_json_shape() {
        let op = DocMutation::SetParagraphStyle {
            start: 0,
            end: 4,
            style: ParagraphStyle::heading(2),
        };
        let json = serde_json::to_value(&op).unwrap();
        assert_eq!(json["op"], "setParagraphStyle");
        assert_eq!(json["style"]["headingLevel"], 2);
    }
}
