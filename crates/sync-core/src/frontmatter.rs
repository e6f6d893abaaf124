//! Front-matter stripping.
//!
//! File bodies are hashed and converted without their YAML front matter:
//! metadata edits (tags, aliases) should not show up in the remote document
//! or register as content changes on their own.

use tracing::warn;

/// Strip a leading YAML front-matter block from raw file text.
///
/// A block is recognized only when the very first line is exactly `---` and a
/// matching closing `---` line occurs later. The YAML between the delimiters
/// is validated; if it fails to parse, the text is returned unchanged (the
/// failure is logged, not raised). Content after the block is returned with
/// surrounding blank lines trimmed.
pub fn strip(raw: &str) -> String {
    let mut lines = raw.lines();
    if lines.next() != Some("---") {
        return raw.to_string();
    }

    // Find the closing delimiter, remembering how much text it spans.
    let mut yaml_lines: Vec<&str> = Vec::new();
    let mut closed = false;
    let mut rest_lines: Vec<&str> = Vec::new();
    for line in lines {
        if !closed && line == "---" {
            closed = true;
            continue;
        }
        if closed {
            rest_lines.push(line);
        } else {
            yaml_lines.push(line);
        }
    }

    if !closed {
        return raw.to_string();
    }

    let yaml = yaml_lines.join("\n");
    if let Err(e) = serde_yaml::from_str::<serde_yaml::Value>(&yaml) {
        warn!("Malformed front matter left in place: {}", e);
        return raw.to_string();
    }

    rest_lines.join("\n").trim_matches('\n').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_frontmatter_block() {
        let raw = "---\ntitle: Note\ntags: [a, b]\n---\n\n# Body\n\nText.";
        assert_eq!(strip(raw), "# Body\n\nText.");
    }

    #[test]
    fn test_no_frontmatter_returns_raw() {
        let raw = "# Just a heading\n\nSome content.";
        assert_eq!(strip(raw), raw);
    }

    #[test]
    fn test_unclosed_block_returns_raw() {
        let raw = "---\ntitle: Note\n\n# Body";
        assert_eq!(strip(raw), raw);
    }

    #[test]
    fn test_delimiter_must_be_first_line() {
        let raw = "intro\n---\ntitle: Note\n---\nbody";
        assert_eq!(strip(raw), raw);
    }

    #[test]
    fn test_invalid_yaml_returns_raw() {
        let raw = "---\n: [ not yaml\n---\nbody";
        assert_eq!(strip(raw), raw);
    }

    #[test]
    fn test_body_untouched_beyond_stripping() {
        let raw = "---\nk: v\n---\nline one\n\n  indented\nline three";
        assert_eq!(strip(raw), "line one\n\n  indented\nline three");
    }

    #[test]
    fn test_empty_body_after_block() {
        let raw = "---\nk: v\n---\n\n";
        assert_eq!(strip(raw), "");
    }
}
