//! Tree -> document conversion.
//!
//! Flattens a folder tree into the ordered mutation ops that rebuild the
//! remote document from scratch. Pushes are always clear-then-rebuild, never
//! an in-place patch, which keeps the index bookkeeping local to a single
//! emission pass.

use crate::document::{DocMutation, ParagraphStyle, StyledRun};
use crate::markdown::{self, MdBlock};
use crate::tree::TreeNode;

/// Convert a tree into the op sequence that reproduces it as a flat,
/// heading-leveled document. The synthetic root itself is not emitted;
/// every other folder and file becomes a heading at `min(level, 6)`,
/// and file bodies follow their heading as styled paragraphs.
pub fn tree_to_mutations(root: &TreeNode) -> Vec<DocMutation> {
    let mut builder = OpBuilder::default();
    if let Some(children) = &root.children {
        for child in children {
            emit_node(&mut builder, child);
        }
    }
    builder.ops
}

fn emit_node(builder: &mut OpBuilder, node: &TreeNode) {
    let heading = ParagraphStyle::heading(node.level.min(6) as u8);
    match &node.children {
        Some(children) => {
            builder.paragraph(vec![StyledRun::plain(&node.name)], Some(heading));
            for child in children {
                emit_node(builder, child);
            }
        }
        None => {
            let body = node.body.as_deref().unwrap_or_default();
            if body.trim().is_empty() {
                return;
            }
            builder.paragraph(vec![StyledRun::plain(&node.name)], Some(heading));
            emit_blocks(builder, &markdown::parse_blocks(body), false);
        }
    }
}

fn emit_blocks(builder: &mut OpBuilder, blocks: &[MdBlock], quoted: bool) {
    for block in blocks {
        match block {
            MdBlock::Heading { depth, text } => {
                let style = ParagraphStyle {
                    heading_level: Some((*depth).min(6)),
                    indented: quoted,
                };
                builder.paragraph(styled(markdown::parse_inline(text), quoted), Some(style));
            }
            MdBlock::Paragraph { text } => {
                builder.paragraph(styled(markdown::parse_inline(text), quoted), quote_style(quoted));
            }
            MdBlock::Blockquote { blocks } => {
                emit_blocks(builder, blocks, true);
            }
            MdBlock::List { items, ordered } => {
                for (i, item) in items.iter().enumerate() {
                    let prefix = if *ordered {
                        format!("{}. ", i + 1)
                    } else {
                        "\u{2022} ".to_string()
                    };
                    let mut runs = vec![StyledRun::plain(prefix)];
                    runs.extend(markdown::parse_inline(item));
                    builder.paragraph(styled(runs, quoted), quote_style(quoted));
                }
            }
            MdBlock::Rule => {
                builder.paragraph(vec![StyledRun::plain("---")], quote_style(quoted));
            }
        }
    }
}

/// Blockquoted content is marked indented and forced italic.
fn styled(mut runs: Vec<StyledRun>, quoted: bool) -> Vec<StyledRun> {
    if quoted {
        for run in &mut runs {
            run.italic = true;
        }
    }
    runs
}

fn quote_style(quoted: bool) -> Option<ParagraphStyle> {
    quoted.then(|| ParagraphStyle {
        heading_level: None,
        indented: true,
    })
}

/// Accumulates ops while tracking the character index cursor.
#[derive(Default)]
struct OpBuilder {
    ops: Vec<DocMutation>,
    index: usize,
}

impl OpBuilder {
    /// Emit one paragraph: an insert of its text plus a trailing newline,
    /// an optional paragraph style over the whole range, and one text-style
    /// op per run that carries styling.
    fn paragraph(&mut self, runs: Vec<StyledRun>, style: Option<ParagraphStyle>) {
        let mut text: String = runs.iter().map(|r| r.text.as_str()).collect();
        text.push('\n');
        let len = text.chars().count();
        let start = self.index;

        self.ops.push(DocMutation::InsertText { index: start, text });
        if let Some(style) = style {
            self.ops.push(DocMutation::SetParagraphStyle {
                start,
                end: start + len,
                style,
            });
        }

        let mut offset = start;
        for run in &runs {
            let run_len = run.text.chars().count();
            if run.bold || run.italic {
                self.ops.push(DocMutation::SetTextStyle {
                    start: offset,
                    end: offset + run_len,
                    bold: run.bold,
                    italic: run.italic,
                });
            }
            offset += run_len;
        }

        self.index += len;
    }
}
