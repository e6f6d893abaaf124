//! SyncEngine: the per-folder synchronization decision procedure.
//!
//! Each pass is evaluated fresh from current state:
//!
//! 1. No metadata file -> link: create the remote document, push the tree,
//!    persist metadata.
//! 2. Linked -> compare fingerprints against the persisted ones and branch:
//!    - neither side changed: no-op
//!    - local only: full-rewrite push
//!    - remote only: pull sections into local files
//!    - both: conflict, returned unresolved with metadata untouched so the
//!      next pass re-detects it
//!
//! There is no locking; correctness against concurrent external edits relies
//! on the fingerprint comparison at the start of each pass. A failed pass
//! never writes metadata, so retries stay sound.

use crate::convert::tree_to_mutations;
use crate::document::RemoteDocument;
use crate::fs::{FileSystem, FsError};
use crate::merge::{ConflictInfo, ConflictKind};
use crate::metadata::{self, MetadataError, RemoteHash, SyncMetadata};
use crate::sections;
use crate::store::{DocumentStore, StoreError, TokenProvider};
use crate::tree::{self, TreeError, TreeNode};

use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Filesystem error: {0}")]
    Fs(#[from] FsError),

    #[error("Tree error: {0}")]
    Tree(#[from] TreeError),

    #[error("Metadata error: {0}")]
    Metadata(#[from] MetadataError),

    #[error("Document store error: {0}")]
    Store(#[from] StoreError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;

/// Immutable engine configuration, fixed at construction. Settings changes
/// produce a new configuration value and a fresh engine, never shared
/// mutable state.
#[derive(Debug, Clone, Default)]
pub struct SyncConfig {
    /// Prepended to the folder name when titling newly created documents.
    pub title_prefix: Option<String>,
}

impl SyncConfig {
    fn document_title(&self, folder_name: &str) -> String {
        match &self.title_prefix {
            Some(prefix) => format!("{}{}", prefix, folder_name),
            None => folder_name.to_string(),
        }
    }
}

/// Outcome of one sync pass. Every pass yields exactly one of these;
/// collaborator errors become a failed result, never a panic or a lost pass.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResult {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_url: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub conflicts: Vec<ConflictInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SyncResult {
    fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            document_id: None,
            document_url: None,
            conflicts: Vec::new(),
            error: None,
        }
    }

    fn failed(message: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            document_id: None,
            document_url: None,
            conflicts: Vec::new(),
            error: Some(error.into()),
        }
    }
}

/// Aggregate of a sync-all run. Per-folder failures are isolated; one bad
/// folder never aborts the rest.
#[derive(Debug)]
pub struct BatchReport {
    pub results: Vec<SyncResult>,
    pub succeeded: usize,
    pub failed: usize,
}

pub struct SyncEngine<F, D, T> {
    fs: F,
    store: D,
    tokens: T,
    config: SyncConfig,
}

impl<F, D, T> SyncEngine<F, D, T>
where
    F: FileSystem,
    D: DocumentStore,
    T: TokenProvider,
{
    pub fn new(fs: F, store: D, tokens: T, config: SyncConfig) -> Self {
        Self {
            fs,
            store,
            tokens,
            config,
        }
    }

    /// Check that a usable credential is available.
    pub async fn validate_credentials(&self) -> bool {
        self.tokens.valid_token().await.is_ok()
    }

    /// Run one sync pass for a folder.
    ///
    /// Known asymmetry with the push direction: pull materializes only
    /// sections at heading level >= 2, always as flat files directly under
    /// the synced folder (level 1 is the folder root itself, and nested
    /// sub-folders are not reconstructed for deeper levels).
    pub async fn sync_folder(&self, folder: &str) -> SyncResult {
        // Credentials come first; their failure is reported distinctly so
        // callers can prompt re-authorization instead of retrying.
        if let Err(e) = self.tokens.valid_token().await {
            warn!("Sync of {} aborted: {}", folder, e);
            return SyncResult::failed("Not authenticated", e.to_string());
        }

        match self.run_pass(folder).await {
            Ok(result) => result,
            Err(e) => {
                warn!("Sync of {} failed: {}", folder, e);
                SyncResult::failed(format!("Sync failed for {}", folder), e.to_string())
            }
        }
    }

    /// Sync every folder in turn, sequentially, isolating failures.
    pub async fn sync_all_folders(&self, folders: &[String]) -> BatchReport {
        let mut results = Vec::with_capacity(folders.len());
        let mut succeeded = 0;
        let mut failed = 0;

        for folder in folders {
            let result = self.sync_folder(folder).await;
            if result.success {
                succeeded += 1;
            } else {
                failed += 1;
            }
            results.push(result);
        }

        info!("Batch sync done: {} ok, {} failed", succeeded, failed);
        BatchReport {
            results,
            succeeded,
            failed,
        }
    }

    /// Remove the sync link. Local files and the remote document stay.
    pub async fn unlink_folder(&self, folder: &str) -> Result<()> {
        metadata::delete(&self.fs, folder).await?;
        info!("Unlinked {}", folder);
        Ok(())
    }

    /// Stored metadata for a folder, if linked.
    pub async fn status(&self, folder: &str) -> Result<Option<SyncMetadata>> {
        Ok(metadata::read(&self.fs, folder).await?)
    }

    async fn run_pass(&self, folder: &str) -> Result<SyncResult> {
        let stored = metadata::read(&self.fs, folder).await?;
        let local_tree = tree::build_tree(&self.fs, folder).await?;
        let local_hash = tree::hash_node(&local_tree);

        match stored {
            None => self.link(folder, &local_tree, &local_hash).await,
            Some(meta) => self.reconcile(folder, &local_tree, &local_hash, meta).await,
        }
    }

    /// First sync: create the remote document and push the whole tree.
    async fn link(&self, folder: &str, local_tree: &TreeNode, local_hash: &str) -> Result<SyncResult> {
        let title = self.config.document_title(&local_tree.name);
        let handle = self.store.create_document(&title).await?;

        let ops = tree_to_mutations(local_tree);
        let revision = if ops.is_empty() {
            handle.revision.clone()
        } else {
            self.store.apply_mutations(&handle.id, &ops).await?
        };

        let remote_doc = self.store.get_document(&handle.id).await?;
        let remote_hash = tree::hash_content(&sections::to_markdown(&remote_doc));

        let mut meta = metadata::create(&handle.id, folder, local_hash, Some(revision));
        meta.remote_content_hash = RemoteHash::Known(remote_hash);
        metadata::write(&self.fs, folder, &meta).await?;

        info!("Linked {} to document {}", folder, handle.id);
        Ok(SyncResult {
            document_id: Some(handle.id.clone()),
            document_url: Some(self.store.document_url(&handle.id)),
            ..SyncResult::ok(format!("Created \"{}\" and linked folder", title))
        })
    }

    async fn reconcile(
        &self,
        folder: &str,
        local_tree: &TreeNode,
        local_hash: &str,
        meta: SyncMetadata,
    ) -> Result<SyncResult> {
        let remote_doc = self.store.get_document(&meta.remote_id).await?;
        let remote_markdown = sections::to_markdown(&remote_doc);
        let remote_hash = tree::hash_content(&remote_markdown);

        let local_changed = local_hash != meta.local_content_hash;
        // The revision token alone is not trusted as proof of change (a
        // bump can be cosmetic); the content hash is the authority, and an
        // unknown stored hash always counts as changed.
        let remote_changed = meta.remote_revision.as_deref() != Some(remote_doc.revision.as_str())
            || match meta.remote_content_hash.known() {
                None => true,
                Some(stored) => stored != remote_hash,
            };

        debug!(
            "{}: local_changed={} remote_changed={}",
            folder, local_changed, remote_changed
        );

        match (local_changed, remote_changed) {
            (false, false) => Ok(SyncResult {
                document_id: Some(meta.remote_id.clone()),
                document_url: Some(self.store.document_url(&meta.remote_id)),
                ..SyncResult::ok("Already up to date")
            }),
            (true, false) => self.push(folder, local_tree, local_hash, meta).await,
            (false, true) => self.pull(folder, &remote_doc, &remote_hash, meta).await,
            (true, true) => self.conflict(local_tree, &remote_doc, meta),
        }
    }

    /// Full-rewrite push: clear the remote document and rebuild it from the
    /// fresh tree. Never a partial in-place patch.
    async fn push(
        &self,
        folder: &str,
        local_tree: &TreeNode,
        local_hash: &str,
        mut meta: SyncMetadata,
    ) -> Result<SyncResult> {
        self.store.clear_document(&meta.remote_id).await?;
        let ops = tree_to_mutations(local_tree);
        if !ops.is_empty() {
            self.store.apply_mutations(&meta.remote_id, &ops).await?;
        }

        let remote_doc = self.store.get_document(&meta.remote_id).await?;
        let remote_hash = tree::hash_content(&sections::to_markdown(&remote_doc));

        meta.local_content_hash = local_hash.to_string();
        meta.remote_content_hash = RemoteHash::Known(remote_hash);
        meta.remote_revision = Some(remote_doc.revision.clone());
        meta.last_sync_time = Utc::now();
        metadata::write(&self.fs, folder, &meta).await?;

        info!("Pushed {} to document {}", folder, meta.remote_id);
        Ok(SyncResult {
            document_id: Some(meta.remote_id.clone()),
            document_url: Some(self.store.document_url(&meta.remote_id)),
            ..SyncResult::ok("Pushed local changes to remote document")
        })
    }

    /// Pull: write each level >= 2 section back as a flat local file.
    async fn pull(
        &self,
        folder: &str,
        remote_doc: &RemoteDocument,
        remote_hash: &str,
        mut meta: SyncMetadata,
    ) -> Result<SyncResult> {
        let section_list = sections::extract_sections(remote_doc);
        let mut written = 0usize;

        for section in &section_list {
            if section.level < 2 {
                // Level 1 is the synced folder itself, not a file.
                continue;
            }
            // Path separators cannot appear in file names.
            let name = section.title.replace('/', "-");
            let path = format!("{}/{}.md", folder.trim_end_matches('/'), name);
            let mut content = section.content.clone();
            if !content.is_empty() && !content.ends_with('\n') {
                content.push('\n');
            }
            self.fs.write(&path, content.as_bytes()).await?;
            written += 1;
        }

        // Fingerprint the folder as it now stands.
        let new_tree = tree::build_tree(&self.fs, folder).await?;
        meta.local_content_hash = tree::hash_node(&new_tree);
        meta.remote_content_hash = RemoteHash::Known(remote_hash.to_string());
        meta.remote_revision = Some(remote_doc.revision.clone());
        meta.last_sync_time = Utc::now();
        metadata::write(&self.fs, folder, &meta).await?;

        info!("Pulled {} section(s) into {}", written, folder);
        Ok(SyncResult {
            document_id: Some(meta.remote_id.clone()),
            document_url: Some(self.store.document_url(&meta.remote_id)),
            ..SyncResult::ok(format!("Pulled {} section(s) from remote document", written))
        })
    }

    /// Both sides changed: package the two structures for an external
    /// chooser and leave metadata untouched so the next pass re-detects
    /// the same conflict until it is resolved.
    fn conflict(
        &self,
        local_tree: &TreeNode,
        remote_doc: &RemoteDocument,
        meta: SyncMetadata,
    ) -> Result<SyncResult> {
        let local_json = serde_json::to_string_pretty(local_tree)?;
        let remote_json = serde_json::to_string_pretty(&sections::extract_sections(remote_doc))?;

        let info = ConflictInfo {
            kind: ConflictKind::Structure,
            local_version: local_json,
            remote_version: remote_json,
            description: format!(
                "Both {} and the remote document changed since the last sync",
                meta.folder_path
            ),
        };

        warn!("Conflict detected for {}", meta.folder_path);
        Ok(SyncResult {
            success: false,
            message: "Sync conflict: both local folder and remote document changed".into(),
            document_id: Some(meta.remote_id.clone()),
            document_url: Some(self.store.document_url(&meta.remote_id)),
            conflicts: vec![info],
            error: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Paragraph, ParagraphStyle, RemoteDocument, StyledRun};
    use crate::fs::InMemoryFs;
    use crate::store::{InMemoryDocStore, NoTokens, StaticTokens};
    use std::sync::Arc;

    fn engine(
        fs: Arc<InMemoryFs>,
        store: Arc<InMemoryDocStore>,
    ) -> SyncEngine<Arc<InMemoryFs>, Arc<InMemoryDocStore>, StaticTokens> {
        SyncEngine::new(
            fs,
            store,
            StaticTokens("token".into()),
            SyncConfig::default(),
        )
    }

    async fn seeded_fs() -> Arc<InMemoryFs> {
        let fs = Arc::new(InMemoryFs::new());
        fs.write("notes/alpha.md", b"alpha content").await.unwrap();
        fs.write("notes/beta.md", b"beta content").await.unwrap();
        fs
    }

    #[tokio::test]
    async fn test_not_authenticated_is_distinct() {
        let fs = seeded_fs().await;
        let store = Arc::new(InMemoryDocStore::new());
        let engine = SyncEngine::new(fs, store, NoTokens, SyncConfig::default());

        let result = engine.sync_folder("notes").await;
        assert!(!result.success);
        assert_eq!(result.message, "Not authenticated");
        assert!(result.error.is_some());
    }

    #[tokio::test]
    async fn test_title_uses_config_prefix() {
        let fs = seeded_fs().await;
        let store = Arc::new(InMemoryDocStore::new());
        let engine = SyncEngine::new(
            Arc::clone(&fs),
            Arc::clone(&store),
            StaticTokens("t".into()),
            SyncConfig {
                title_prefix: Some("Vault: ".into()),
            },
        );

        let result = engine.sync_folder("notes").await;
        let id = result.document_id.unwrap();
        assert_eq!(store.title(&id).as_deref(), Some("Vault: notes"));
    }

    #[tokio::test]
    async fn test_pull_writes_level_two_sections_only() {
        let fs = seeded_fs().await;
        let store = Arc::new(InMemoryDocStore::new());
        let engine = engine(Arc::clone(&fs), Arc::clone(&store));

        let result = engine.sync_folder("notes").await;
        assert!(result.success);
        let id = result.document_id.unwrap();

        // External remote edit: a level-1 heading plus a new level-2 section.
        let mut doc = RemoteDocument::new(id.clone(), "ignored");
        doc.blocks = vec![
            Paragraph {
                runs: vec![StyledRun::plain("notes")],
                style: Some(ParagraphStyle::heading(1)),
            },
            Paragraph {
                runs: vec![StyledRun::plain("gamma")],
                style: Some(ParagraphStyle::heading(2)),
            },
            Paragraph {
                runs: vec![StyledRun::plain("gamma body")],
                style: None,
            },
        ];
        store.edit_externally(&id, doc);

        let result = engine.sync_folder("notes").await;
        assert!(result.success, "{:?}", result);
        assert!(fs.exists("notes/gamma.md").await.unwrap());
        assert_eq!(
            fs.read("notes/gamma.md").await.unwrap(),
            b"gamma body\n".to_vec()
        );
        // The level-1 heading is the folder root; no "notes.md" file.
        assert!(!fs.exists("notes/notes.md").await.unwrap());
    }

    #[tokio::test]
    async fn test_conflict_leaves_metadata_untouched() {
        let fs = seeded_fs().await;
        let store = Arc::new(InMemoryDocStore::new());
        let engine = engine(Arc::clone(&fs), Arc::clone(&store));

        let result = engine.sync_folder("notes").await;
        let id = result.document_id.unwrap();
        let before = metadata::read(&fs, "notes").await.unwrap().unwrap();

        // Edit both sides.
        fs.write("notes/alpha.md", b"alpha EDITED").await.unwrap();
        let mut doc = store.get_document(&id).await.unwrap();
        doc.blocks.push(Paragraph {
            runs: vec![StyledRun::plain("remote addition")],
            style: None,
        });
        store.edit_externally(&id, doc);

        let result = engine.sync_folder("notes").await;
        assert!(!result.success);
        assert_eq!(result.conflicts.len(), 1);
        assert_eq!(result.conflicts[0].kind, ConflictKind::Structure);

        let after = metadata::read(&fs, "notes").await.unwrap().unwrap();
        assert_eq!(after.local_content_hash, before.local_content_hash);
        assert_eq!(after.remote_revision, before.remote_revision);
        assert_eq!(after.last_sync_time, before.last_sync_time);
    }

    #[tokio::test]
    async fn test_cosmetic_revision_bump_is_not_a_pull() {
        let fs = seeded_fs().await;
        let store = Arc::new(InMemoryDocStore::new());
        let engine = engine(Arc::clone(&fs), Arc::clone(&store));

        let result = engine.sync_folder("notes").await;
        let id = result.document_id.unwrap();

        // Rewrite the document with identical content: the revision token
        // changes but the rendered markdown does not.
        let doc = store.get_document(&id).await.unwrap();
        store.edit_externally(&id, doc);

        // remote_changed fires on the revision mismatch, routing to pull;
        // content is unchanged so the pass must still converge cleanly.
        let result = engine.sync_folder("notes").await;
        assert!(result.success);

        // And a further pass is a no-op.
        let result = engine.sync_folder("notes").await;
        assert!(result.success);
        assert_eq!(result.message, "Already up to date");
    }

    #[tokio::test]
    async fn test_unlink_then_sync_relinks() {
        let fs = seeded_fs().await;
        let store = Arc::new(InMemoryDocStore::new());
        let engine = engine(Arc::clone(&fs), Arc::clone(&store));

        let first = engine.sync_folder("notes").await;
        engine.unlink_folder("notes").await.unwrap();
        assert!(engine.status("notes").await.unwrap().is_none());

        let second = engine.sync_folder("notes").await;
        assert!(second.success);
        assert_ne!(second.document_id, first.document_id);
    }

    #[tokio::test]
    async fn test_sync_all_isolates_failures() {
        let fs = Arc::new(InMemoryFs::new());
        fs.write("good/a.md", b"a").await.unwrap();
        // "missing" has no directory at all, so its pass fails.
        let store = Arc::new(InMemoryDocStore::new());
        let engine = engine(Arc::clone(&fs), store);

        let report = engine
            .sync_all_folders(&["missing".to_string(), "good".to_string()])
            .await;
        assert_eq!(report.failed, 1);
        assert_eq!(report.succeeded, 1);
        assert!(report.results[1].success);
    }
}
