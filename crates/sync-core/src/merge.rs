//! Three-way change classification, line merge and diff.
//!
//! Everything here is a pure function over strings; the engine decides what
//! to do with the results. The line merge is deliberately conservative: a
//! single line edited differently on both sides voids the whole merge
//! rather than producing partial output or conflict markers.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictKind {
    Content,
    Structure,
}

/// A both-sides-changed situation, packaged for an external chooser.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictInfo {
    pub kind: ConflictKind,
    pub local_version: String,
    pub remote_version: String,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffKind {
    Added,
    Removed,
    Modified,
}

/// One detected line-level difference.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentDiff {
    pub kind: DiffKind,
    pub location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_value: Option<String>,
}

/// True iff both sides diverged from base and from each other.
/// Convergent edits (local == remote) are not a conflict.
pub fn detect_conflict(local: &str, remote: &str, base: &str) -> bool {
    local != base && remote != base && local != remote
}

/// Resolve trivially when only one side changed, fall back to a line merge
/// otherwise. Returns `None` when nothing can be reconciled automatically.
pub fn auto_resolve(local: &str, remote: &str, base: &str) -> Option<String> {
    if local == base {
        return Some(remote.to_string());
    }
    if remote == base {
        return Some(local.to_string());
    }
    if local == remote {
        return Some(local.to_string());
    }
    try_line_merge(local, remote, base)
}

/// Line-by-line three-way merge. All-or-nothing: any line changed
/// differently on both sides fails the whole merge.
pub fn try_line_merge(local: &str, remote: &str, base: &str) -> Option<String> {
    let local_lines: Vec<&str> = local.split('\n').collect();
    let remote_lines: Vec<&str> = remote.split('\n').collect();
    let base_lines: Vec<&str> = base.split('\n').collect();

    let len = local_lines.len().max(remote_lines.len()).max(base_lines.len());
    let mut merged = Vec::with_capacity(len);

    for i in 0..len {
        let l = local_lines.get(i).copied().unwrap_or("");
        let r = remote_lines.get(i).copied().unwrap_or("");
        let b = base_lines.get(i).copied().unwrap_or("");

        if l == r {
            merged.push(l);
        } else if l == b {
            merged.push(r);
        } else if r == b {
            merged.push(l);
        } else {
            return None;
        }
    }

    Some(merged.join("\n"))
}

/// Greedy line-oriented diff.
///
/// On a mismatch, looks ahead in both sequences to classify the change:
/// the current old line found later in new means lines were inserted, the
/// current new line found later in old means lines were removed, and
/// insertion wins only when its lookahead distance is strictly smaller.
/// Neither found means a direct modification. This is a display heuristic,
/// not a minimal-edit-distance diff; the tie-break is part of its contract.
pub fn generate_diff(old: &str, new: &str) -> Vec<ContentDiff> {
    let old_lines: Vec<&str> = old.split('\n').collect();
    let new_lines: Vec<&str> = new.split('\n').collect();

    let mut diffs = Vec::new();
    let mut i = 0;
    let mut j = 0;

    while i < old_lines.len() || j < new_lines.len() {
        if i >= old_lines.len() {
            diffs.push(added(j, new_lines[j]));
            j += 1;
            continue;
        }
        if j >= new_lines.len() {
            diffs.push(removed(i, old_lines[i]));
            i += 1;
            continue;
        }
        if old_lines[i] == new_lines[j] {
            i += 1;
            j += 1;
            continue;
        }

        let ins_dist = new_lines[j + 1..].iter().position(|l| *l == old_lines[i]);
        let del_dist = old_lines[i + 1..].iter().position(|l| *l == new_lines[j]);

        match (ins_dist, del_dist) {
            (Some(a), Some(d)) if a < d => {
                diffs.push(added(j, new_lines[j]));
                j += 1;
            }
            (Some(_), None) => {
                diffs.push(added(j, new_lines[j]));
                j += 1;
            }
            (_, Some(_)) => {
                diffs.push(removed(i, old_lines[i]));
                i += 1;
            }
            (None, None) => {
                diffs.push(ContentDiff {
                    kind: DiffKind::Modified,
                    location: format!("line {}", i + 1),
                    old_value: Some(old_lines[i].to_string()),
                    new_value: Some(new_lines[j].to_string()),
                });
                i += 1;
                j += 1;
            }
        }
    }

    diffs
}

fn added(index: usize, line: &str) -> ContentDiff {
    ContentDiff {
        kind: DiffKind::Added,
        location: format!("line {}", index + 1),
        old_value: None,
        new_value: Some(line.to_string()),
    }
}

fn removed(index: usize, line: &str) -> ContentDiff {
    ContentDiff {
        kind: DiffKind::Removed,
        location: format!("line {}", index + 1),
        old_value: Some(line.to_string()),
        new_value: None,
    }
}

/// Package a content conflict for the external chooser.
pub fn content_conflict(local: &str, remote: &str, description: &str) -> ConflictInfo {
    ConflictInfo {
        kind: ConflictKind::Content,
        local_version: local.to_string(),
        remote_version: remote.to_string(),
        description: description.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_conflict_totality() {
        assert!(detect_conflict("h1", "h2", "h3"));
        assert!(!detect_conflict("h1", "h2", "h2")); // only local changed
        assert!(!detect_conflict("h2", "h1", "h2")); // only remote changed
        assert!(!detect_conflict("h1", "h1", "h1")); // nothing changed
        assert!(!detect_conflict("h1", "h1", "h2")); // convergent edits
    }

    #[test]
    fn test_auto_resolve_base_cases() {
        assert_eq!(auto_resolve("base", "remote", "base").as_deref(), Some("remote"));
        assert_eq!(auto_resolve("local", "base", "base").as_deref(), Some("local"));
        assert_eq!(auto_resolve("x", "x", "base").as_deref(), Some("x"));
    }

    #[test]
    fn test_line_merge_independent_edits() {
        let base = "L1\nL2\nL3";
        let local = "L1\nlocal2\nL3";
        let remote = "L1\nL2\nremote3";
        assert_eq!(
            try_line_merge(local, remote, base).as_deref(),
            Some("L1\nlocal2\nremote3")
        );
    }

    #[test]
    fn test_line_merge_same_line_double_edit_fails() {
        let base = "L1\nL2";
        let local = "L1\nlocal";
        let remote = "L1\nremote";
        assert_eq!(try_line_merge(local, remote, base), None);
    }

    #[test]
    fn test_line_merge_handles_length_differences() {
        let base = "L1";
        let local = "L1\nadded by local";
        let remote = "L1";
        assert_eq!(
            try_line_merge(local, remote, base).as_deref(),
            Some("L1\nadded by local")
        );
    }

    #[test]
    fn test_auto_resolve_falls_through_to_line_merge() {
        let base = "L1\nL2\nL3";
        let local = "changed1\nL2\nL3";
        let remote = "L1\nL2\nchanged3";
        assert_eq!(
            auto_resolve(local, remote, base).as_deref(),
            Some("changed1\nL2\nchanged3")
        );
    }

    #[test]
    fn test_diff_detects_added_line() {
        let diffs = generate_diff("L1\nL2", "L1\nL2\nL3");
        assert_eq!(diffs.len(), 1);
        assert_eq!(diffs[0].kind, DiffKind::Added);
        assert_eq!(diffs[0].location, "line 3");
        assert_eq!(diffs[0].new_value.as_deref(), Some("L3"));
    }

    #[test]
    fn test_diff_detects_removed_line() {
        let diffs = generate_diff("L1\nL2\nL3", "L1\nL3");
        assert!(diffs.iter().any(|d| d.kind == DiffKind::Removed
            && d.old_value.as_deref() == Some("L2")));
    }

    #[test]
    fn test_diff_detects_modified_line() {
        let diffs = generate_diff("L1\nL2\nL3", "L1\nModified\nL3");
        assert!(diffs.iter().any(|d| d.kind == DiffKind::Modified
            && d.old_value.as_deref() == Some("L2")
            && d.new_value.as_deref() == Some("Modified")));
    }

    #[test]
    fn test_diff_identical_inputs_is_empty() {
        assert!(generate_diff("a\nb", "a\nb").is_empty());
    }

    #[test]
    fn test_diff_prefers_insertion_on_strictly_closer_distance() {
        // old line "X" reappears immediately in new; new line "A" never
        // appears in old, so this is an insertion of "A".
        let diffs = generate_diff("X", "A\nX");
        assert_eq!(diffs.len(), 1);
        assert_eq!(diffs[0].kind, DiffKind::Added);
        assert_eq!(diffs[0].new_value.as_deref(), Some("A"));
    }

    #[test]
    fn test_content_conflict_shape() {
        let info = content_conflict("l", "r", "note.md differs");
        assert_eq!(info.kind, ConflictKind::Content);
        assert_eq!(info.local_version, "l");
        assert_eq!(info.remote_version, "r");
        assert_eq!(info.description, "note.md differs");
    }
}
