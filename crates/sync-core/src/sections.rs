//! Document -> markdown / section extraction.
//!
//! The inverse of `convert`: renders the flat styled-paragraph sequence back
//! to linear markdown, and groups it into heading-delimited sections for the
//! pull path.

use crate::document::{Paragraph, RemoteDocument, Section};
use crate::markdown;

/// Render the whole document as markdown.
///
/// Blank paragraphs are dropped; remaining blocks are joined with blank
/// lines, so headings are always preceded by one (except at the start).
pub fn to_markdown(doc: &RemoteDocument) -> String {
    let parts: Vec<String> = doc
        .blocks
        .iter()
        .filter(|block| !block.text().trim().is_empty())
        .map(render_paragraph)
        .collect();
    parts.join("\n\n")
}

/// Group the document into sections, one per heading paragraph.
///
/// Non-heading paragraphs accumulate into the currently open section,
/// rendered with the same per-paragraph rule as [`to_markdown`]. Content
/// before the first heading has no section to live in and is dropped: the
/// structural mapping puts every folder and file onto a heading, so a
/// well-formed document always opens with one.
pub fn extract_sections(doc: &RemoteDocument) -> Vec<Section> {
    let mut sections: Vec<Section> = Vec::new();
    let mut current: Option<Section> = None;

    for block in &doc.blocks {
        if block.text().trim().is_empty() {
            continue;
        }
        if let Some(level) = block.heading_level() {
            if let Some(done) = current.take() {
                sections.push(done);
            }
            current = Some(Section {
                level: level as u32,
                title: block.text().trim().to_string(),
                content: String::new(),
            });
            continue;
        }
        if let Some(section) = &mut current {
            if !section.content.is_empty() {
                section.content.push_str("\n\n");
            }
            section.content.push_str(&render_paragraph(block));
        }
    }

    if let Some(done) = current.take() {
        sections.push(done);
    }
    sections
}

/// Render a single paragraph as one line of markdown.
fn render_paragraph(block: &Paragraph) -> String {
    let text = markdown::render_runs(&block.runs);

    if let Some(level) = block.heading_level() {
        return format!("{} {}", "#".repeat(level.min(6) as usize), text.trim());
    }

    let trimmed = text.trim();
    if trimmed.len() >= 3 && trimmed.chars().all(|c| c == '-') {
        return "---".to_string();
    }

    if block.style.as_ref().is_some_and(|s| s.indented) {
        return format!("> {}", trimmed);
    }

    text
}
