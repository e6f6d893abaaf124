//! Remote document store and credential provider abstractions.
//!
//! The engine only ever talks to the remote side through these traits.
//! `InMemoryDocStore` is the test double; `FileDocStore` (in sync-cli) is a
//! file-backed implementation. A networked backend would live behind the
//! same trait and translate `DocMutation` batches into its wire API.

use crate::document::{DocMutation, RemoteDocument};

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("Network error: {0}")]
    Network(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Identifier and revision token of a freshly created document.
#[derive(Debug, Clone)]
pub struct DocumentHandle {
    pub id: String,
    pub revision: String,
}

/// Abstract remote document storage.
///
/// `revision` is an opaque token that changes on every content mutation;
/// the engine never interprets it beyond equality.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Create an empty document with the given title.
    async fn create_document(&self, title: &str) -> Result<DocumentHandle>;

    /// Fetch the current document state.
    async fn get_document(&self, id: &str) -> Result<RemoteDocument>;

    /// Apply a mutation batch; returns the new revision token.
    async fn apply_mutations(&self, id: &str, ops: &[DocMutation]) -> Result<String>;

    /// Remove all content from the document.
    async fn clear_document(&self, id: &str) -> Result<()>;

    /// Human-facing URL for the document.
    fn document_url(&self, id: &str) -> String;
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Not authenticated: {0}")]
    NotAuthenticated(String),
}

/// Credential provider. Implementations refresh transparently; the engine
/// calls this before any remote operation and treats failure as fatal for
/// the pass.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn valid_token(&self) -> std::result::Result<String, AuthError>;
}

/// Fixed token, for tests and for backends that need no credentials.
pub struct StaticTokens(pub String);

#[async_trait]
impl TokenProvider for StaticTokens {
    async fn valid_token(&self) -> std::result::Result<String, AuthError> {
        Ok(self.0.clone())
    }
}

/// Always fails, for exercising the not-authenticated path.
pub struct NoTokens;

#[async_trait]
impl TokenProvider for NoTokens {
    async fn valid_token(&self) -> std::result::Result<String, AuthError> {
        Err(AuthError::NotAuthenticated("no credentials configured".into()))
    }
}

/// In-memory document store for testing.
pub struct InMemoryDocStore {
    docs: RwLock<HashMap<String, RemoteDocument>>,
    titles: RwLock<HashMap<String, String>>,
    counter: AtomicU64,
}

impl InMemoryDocStore {
    pub fn new() -> Self {
        Self {
            docs: RwLock::new(HashMap::new()),
            titles: RwLock::new(HashMap::new()),
            counter: AtomicU64::new(0),
        }
    }

    fn next(&self) -> u64 {
        self.counter.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Title a document was created with (test inspection).
    pub fn title(&self, id: &str) -> Option<String> {
        self.titles.read().unwrap().get(id).cloned()
    }

    /// Overwrite a document's blocks directly, simulating an external
    /// remote edit. Bumps the revision.
    pub fn edit_externally(&self, id: &str, doc: RemoteDocument) {
        let revision = format!("rev-{}", self.next());
        let mut docs = self.docs.write().unwrap();
        docs.insert(
            id.to_string(),
            RemoteDocument {
                id: id.to_string(),
                revision,
                blocks: doc.blocks,
            },
        );
    }
}

impl Default for InMemoryDocStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocStore {
    async fn create_document(&self, title: &str) -> Result<DocumentHandle> {
        let id = format!("doc-{}", self.next());
        let revision = format!("rev-{}", self.next());
        let doc = RemoteDocument::new(id.clone(), revision.clone());
        self.docs.write().unwrap().insert(id.clone(), doc);
        self.titles
            .write()
            .unwrap()
            .insert(id.clone(), title.to_string());
        Ok(DocumentHandle { id, revision })
    }

    async fn get_document(&self, id: &str) -> Result<RemoteDocument> {
        self.docs
            .read()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn apply_mutations(&self, id: &str, ops: &[DocMutation]) -> Result<String> {
        let mut docs = self.docs.write().unwrap();
        let doc = docs
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        doc.apply_all(ops);
        doc.revision = format!("rev-{}", self.next());
        Ok(doc.revision.clone())
    }

    async fn clear_document(&self, id: &str) -> Result<()> {
        let mut docs = self.docs.write().unwrap();
        let doc = docs
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        doc.clear();
        doc.revision = format!("rev-{}", self.next());
        Ok(())
    }

    fn document_url(&self, id: &str) -> String {
        format!("memory://{}", id)
    }
}

// Arc forwarding, same pattern as FileSystem.
#[async_trait]
impl<T: DocumentStore + Send + Sync> DocumentStore for std::sync::Arc<T> {
    async fn create_document(&self, title: &str) -> Result<DocumentHandle> {
        (**self).create_document(title).await
    }

    async fn get_document(&self, id: &str) -> Result<RemoteDocument> {
        (**self).get_document(id).await
    }

    async fn apply_mutations(&self, id: &str, ops: &[DocMutation]) -> Result<String> {
        (**self).apply_mutations(id, ops).await
    }

    async fn clear_document(&self, id: &str) -> Result<()> {
        (**self).clear_document(id).await
    }

    fn document_url(&self, id: &str) -> String {
        (**self).document_url(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_and_fetch() {
        let store = InMemoryDocStore::new();
        let handle = store.create_document("My Notes").await.unwrap();

        let doc = store.get_document(&handle.id).await.unwrap();
        assert!(doc.blocks.is_empty());
        assert_eq!(doc.revision, handle.revision);
        assert_eq!(store.title(&handle.id).as_deref(), Some("My Notes"));
    }

    #[tokio::test]
    async fn test_mutations_bump_revision() {
        let store = InMemoryDocStore::new();
        let handle = store.create_document("t").await.unwrap();

        let rev = store
            .apply_mutations(
                &handle.id,
                &[DocMutation::InsertText {
                    index: 0,
                    text: "hi\n".into(),
                }],
            )
            .await
            .unwrap();
        assert_ne!(rev, handle.revision);

        let doc = store.get_document(&handle.id).await.unwrap();
        assert_eq!(doc.blocks[0].text(), "hi");
        assert_eq!(doc.revision, rev);
    }

    #[tokio::test]
    async fn test_clear_empties_and_bumps() {
        let store = InMemoryDocStore::new();
        let handle = store.create_document("t").await.unwrap();
        store
            .apply_mutations(
                &handle.id,
                &[DocMutation::InsertText {
                    index: 0,
                    text: "content\n".into(),
                }],
            )
            .await
            .unwrap();

        store.clear_document(&handle.id).await.unwrap();
        let doc = store.get_document(&handle.id).await.unwrap();
        assert!(doc.blocks.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_document_errors() {
        let store = InMemoryDocStore::new();
        assert!(store.get_document("missing").await.is_err());
        assert!(store.clear_document("missing").await.is_err());
    }

    #[tokio::test]
    async fn test_token_providers() {
        assert_eq!(
            StaticTokens("tok".into()).valid_token().await.unwrap(),
            "tok"
        );
        assert!(NoTokens.valid_token().await.is_err());
    }
}
