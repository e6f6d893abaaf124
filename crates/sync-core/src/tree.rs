//! Folder tree model, canonical serialization and content fingerprints.
//!
//! A `TreeNode` captures one folder or markdown file of the synced hierarchy.
//! Trees are built fresh for every sync pass and never mutated afterwards;
//! change detection works by hashing the canonical serialization of the whole
//! tree and comparing fingerprints across passes.

use crate::frontmatter;
use crate::fs::{FileEntry, FileSystem, FsError};
use crate::metadata::METADATA_FILENAME;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

const MARKDOWN_EXT: &str = ".md";

#[derive(Debug, Error)]
pub enum TreeError {
    #[error("Filesystem error: {0}")]
    Fs(#[from] FsError),
}

pub type Result<T> = std::result::Result<T, TreeError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    File,
    Folder,
}

/// One file or folder in the synced hierarchy.
///
/// Exactly one of `children` (folders) and `body` (files) is present,
/// matching `kind`. `level` is the depth from the synced root, root = 1,
/// and maps directly onto a candidate heading level downstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeNode {
    pub name: String,
    pub path: String,
    pub kind: NodeKind,
    pub level: u32,
    /// Child nodes, folders sorted before files, then lexicographically.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<TreeNode>>,
    /// File body with front matter removed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl TreeNode {
    pub fn is_folder(&self) -> bool {
        self.kind == NodeKind::Folder
    }

    /// Canonical, order-sensitive serialization used for fingerprinting.
    ///
    /// Format: `<kind>:<name>:<level>[:<body>][:children:[<child>,...]]`.
    /// Whitespace is preserved verbatim; any difference in name, level,
    /// body, ordering or child set produces a different string.
    pub fn canonical(&self) -> String {
        let kind = match self.kind {
            NodeKind::File => "file",
            NodeKind::Folder => "folder",
        };
        let mut out = format!("{}:{}:{}", kind, self.name, self.level);
        if let Some(body) = &self.body {
            out.push(':');
            out.push_str(body);
        }
        if let Some(children) = &self.children {
            out.push_str(":children:[");
            for (i, child) in children.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&child.canonical());
            }
            out.push(']');
        }
        out
    }
}

/// SHA-256 fingerprint of a node and all of its descendants.
pub fn hash_node(node: &TreeNode) -> String {
    hash_content(&node.canonical())
}

/// SHA-256 fingerprint of arbitrary text (remote markdown renderings).
pub fn hash_content(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

/// Build a fresh tree for `folder`.
///
/// Lists children through the `FileSystem` abstraction, skips the reserved
/// sync metadata file, includes only `.md` files (front matter stripped) and
/// recurses into subfolders one level deeper. Nothing is cached between
/// calls; every sync pass sees a tree built from current disk state.
pub async fn build_tree<F: FileSystem>(fs: &F, folder: &str) -> Result<TreeNode> {
    let name = folder
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(folder)
        .to_string();
    build_folder(fs, folder, &name, 1).await
}

async fn build_folder<F: FileSystem>(
    fs: &F,
    path: &str,
    name: &str,
    level: u32,
) -> Result<TreeNode> {
    let mut entries = fs.list(path).await?;
    sort_entries(&mut entries);

    let mut children = Vec::new();
    for entry in entries {
        let child_path = join(path, &entry.name);
        if entry.is_dir {
            let child = Box::pin(build_folder(fs, &child_path, &entry.name, level + 1)).await?;
            children.push(child);
        } else {
            if entry.name == METADATA_FILENAME || !entry.name.ends_with(MARKDOWN_EXT) {
                continue;
            }
            let bytes = fs.read(&child_path).await?;
            let raw = String::from_utf8_lossy(&bytes);
            let body = frontmatter::strip(&raw);
            // Remove exactly one extension: "note.md.md" is named "note.md".
            let name = entry
                .name
                .strip_suffix(MARKDOWN_EXT)
                .unwrap_or(&entry.name)
                .to_string();
            children.push(TreeNode {
                name,
                path: child_path,
                kind: NodeKind::File,
                level: level + 1,
                children: None,
                body: Some(body),
            });
        }
    }

    Ok(TreeNode {
        name: name.to_string(),
        path: path.to_string(),
        kind: NodeKind::Folder,
        level,
        children: Some(children),
        body: None,
    })
}

/// Folders before files, then lexicographically by name.
fn sort_entries(entries: &mut [FileEntry]) {
    entries.sort_by(|a, b| b.is_dir.cmp(&a.is_dir).then_with(|| a.name.cmp(&b.name)));
}

fn join(base: &str, name: &str) -> String {
    if base.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", base.trim_end_matches('/'), name)
    }
}
