//! Markdown parsing and rendering at the granularity the converters need.
//!
//! Only the features the remote document can represent are modeled:
//! bold/italic emphasis, headings, blockquotes, lists and horizontal rules.
//! Fenced code blocks are recognized and dropped. Everything else is plain
//! paragraph text.

use crate::document::StyledRun;

/// One block of a parsed markdown body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MdBlock {
    Heading { depth: u8, text: String },
    Paragraph { text: String },
    Blockquote { blocks: Vec<MdBlock> },
    List { items: Vec<String>, ordered: bool },
    Rule,
}

/// Parse inline emphasis into styled runs.
///
/// `**` toggles bold, `*` toggles italic, `***` toggles both; `_` behaves
/// like `*`. Nesting composes: a bold span inside an italic span yields a
/// run that is both. HTML entities in the text are decoded.
pub fn parse_inline(text: &str) -> Vec<StyledRun> {
    let mut runs = Vec::new();
    let mut buf = String::new();
    let mut bold = false;
    let mut italic = false;

    let chars: Vec<char> = text.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let ch = chars[i];
        if ch == '*' || ch == '_' {
            let mut n = 1;
            while i + n < chars.len() && chars[i + n] == ch {
                n += 1;
            }
            let consumed = n.min(3);
            flush(&mut runs, &mut buf, bold, italic);
            match consumed {
                3 => {
                    bold = !bold;
                    italic = !italic;
                }
                2 => bold = !bold,
                _ => italic = !italic,
            }
            i += consumed;
        } else {
            buf.push(ch);
            i += 1;
        }
    }
    flush(&mut runs, &mut buf, bold, italic);
    runs
}

fn flush(runs: &mut Vec<StyledRun>, buf: &mut String, bold: bool, italic: bool) {
    if buf.is_empty() {
        return;
    }
    runs.push(StyledRun {
        text: decode_entities(buf),
        bold,
        italic,
    });
    buf.clear();
}

/// Render runs back to markdown emphasis markers.
pub fn render_runs(runs: &[StyledRun]) -> String {
    let mut out = String::new();
    for run in runs {
        match (run.bold, run.italic) {
            (true, true) => {
                out.push_str("***");
                out.push_str(&run.text);
                out.push_str("***");
            }
            (true, false) => {
                out.push_str("**");
                out.push_str(&run.text);
                out.push_str("**");
            }
            (false, true) => {
                out.push('*');
                out.push_str(&run.text);
                out.push('*');
            }
            (false, false) => out.push_str(&run.text),
        }
    }
    out
}

/// Decode HTML entity sequences to their literal characters.
pub fn decode_entities(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        rest = &rest[pos..];
        match rest.find(';') {
            // Entities are short; anything longer is literal text.
            Some(end) if end <= 8 => {
                if let Some(decoded) = decode_entity(&rest[1..end]) {
                    out.push(decoded);
                } else {
                    out.push_str(&rest[..=end]);
                }
                rest = &rest[end + 1..];
            }
            _ => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => {
            let code = name.strip_prefix('#')?;
            let value = if let Some(hexcode) = code.strip_prefix(['x', 'X']) {
                u32::from_str_radix(hexcode, 16).ok()?
            } else {
                code.parse::<u32>().ok()?
            };
            char::from_u32(value)
        }
    }
}

/// Parse a markdown body into blocks, line by line.
pub fn parse_blocks(body: &str) -> Vec<MdBlock> {
    let lines: Vec<&str> = body.lines().collect();
    let mut blocks = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];
        let trimmed = line.trim();

        if trimmed.is_empty() {
            i += 1;
            continue;
        }

        // Fenced code blocks are dropped entirely.
        if trimmed.starts_with("```") {
            i += 1;
            while i < lines.len() && !lines[i].trim().starts_with("```") {
                i += 1;
            }
            i += 1; // closing fence, if any
            continue;
        }

        if is_rule(trimmed) {
            blocks.push(MdBlock::Rule);
            i += 1;
            continue;
        }

        if let Some((depth, text)) = parse_heading(trimmed) {
            blocks.push(MdBlock::Heading { depth, text });
            i += 1;
            continue;
        }

        if trimmed.starts_with('>') {
            let mut inner = Vec::new();
            while i < lines.len() && lines[i].trim().starts_with('>') {
                let stripped = lines[i].trim().trim_start_matches('>');
                inner.push(stripped.strip_prefix(' ').unwrap_or(stripped).to_string());
                i += 1;
            }
            blocks.push(MdBlock::Blockquote {
                blocks: parse_blocks(&inner.join("\n")),
            });
            continue;
        }

        if let Some(first_ordered) = list_item(trimmed).map(|(ordered, _)| ordered) {
            let mut items = Vec::new();
            while i < lines.len() {
                match list_item(lines[i].trim()) {
                    Some((ordered, text)) if ordered == first_ordered => {
                        items.push(text.to_string());
                        i += 1;
                    }
                    _ => break,
                }
            }
            blocks.push(MdBlock::List {
                items,
                ordered: first_ordered,
            });
            continue;
        }

        // Plain paragraph: soft-wrapped lines joined with a space.
        let mut para = vec![trimmed];
        i += 1;
        while i < lines.len() {
            let next = lines[i].trim();
            if next.is_empty()
                || next.starts_with("```")
                || is_rule(next)
                || parse_heading(next).is_some()
                || next.starts_with('>')
                || list_item(next).is_some()
            {
                break;
            }
            para.push(next);
            i += 1;
        }
        blocks.push(MdBlock::Paragraph {
            text: para.join(" "),
        });
    }

    blocks
}

fn parse_heading(line: &str) -> Option<(u8, String)> {
    let hashes = line.chars().take_while(|c| *c == '#').count();
    if hashes == 0 || hashes > 6 {
        return None;
    }
    let rest = &line[hashes..];
    let text = rest.strip_prefix(' ')?;
    Some((hashes as u8, text.trim().to_string()))
}

fn is_rule(line: &str) -> bool {
    line.len() >= 3
        && (line.chars().all(|c| c == '-')
            || line.chars().all(|c| c == '*')
            || line.chars().all(|c| c == '_'))
}

/// Returns `(ordered, item_text)` when the line is a list item.
fn list_item(line: &str) -> Option<(bool, &str)> {
    if let Some(rest) = line
        .strip_prefix("- ")
        .or_else(|| line.strip_prefix("* "))
        .or_else(|| line.strip_prefix("+ "))
    {
        return Some((false, rest.trim()));
    }
    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits > 0 {
        if let Some(rest) = line[digits..].strip_prefix(". ") {
            return Some((true, rest.trim()));
        }
    }
    None
}
