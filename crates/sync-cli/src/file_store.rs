//! File-backed document store.
//!
//! Persists each remote document as a pretty-printed JSON file under a
//! store directory, one `{id}.json` per document. Useful for local trials
//! and tests; a networked backend would implement the same trait against
//! its wire API.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use sync_core::document::{DocMutation, RemoteDocument};
use sync_core::store::{DocumentHandle, DocumentStore, Result, StoreError};
use tokio::fs;
use uuid::Uuid;

/// On-disk record: the document plus the title it was created with.
#[derive(Debug, Serialize, Deserialize)]
struct StoredDocument {
    title: String,
    document: RemoteDocument,
}

pub struct FileDocStore {
    base_path: PathBuf,
}

impl FileDocStore {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn document_path(&self, id: &str) -> PathBuf {
        self.base_path.join(format!("{}.json", id))
    }

    async fn load(&self, id: &str) -> Result<StoredDocument> {
        let bytes = fs::read(self.document_path(id))
            .await
            .map_err(|_| StoreError::NotFound(id.to_string()))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| StoreError::Network(format!("corrupt document {}: {}", id, e)))
    }

    async fn save(&self, id: &str, stored: &StoredDocument) -> Result<()> {
        fs::create_dir_all(&self.base_path)
            .await
            .map_err(|e| StoreError::Network(e.to_string()))?;
        let json = serde_json::to_vec_pretty(stored)
            .map_err(|e| StoreError::Network(e.to_string()))?;
        fs::write(self.document_path(id), json)
            .await
            .map_err(|e| StoreError::Network(e.to_string()))
    }
}

#[async_trait]
impl DocumentStore for FileDocStore {
    async fn create_document(&self, title: &str) -> Result<DocumentHandle> {
        let id = Uuid::new_v4().to_string();
        let revision = Uuid::new_v4().to_string();
        let stored = StoredDocument {
            title: title.to_string(),
            document: RemoteDocument::new(id.clone(), revision.clone()),
        };
        self.save(&id, &stored).await?;
        Ok(DocumentHandle { id, revision })
    }

    async fn get_document(&self, id: &str) -> Result<RemoteDocument> {
        Ok(self.load(id).await?.document)
    }

    async fn apply_mutations(&self, id: &str, ops: &[DocMutation]) -> Result<String> {
        let mut stored = self.load(id).await?;
        stored.document.apply_all(ops);
        stored.document.revision = Uuid::new_v4().to_string();
        let revision = stored.document.revision.clone();
        self.save(id, &stored).await?;
        Ok(revision)
    }

    async fn clear_document(&self, id: &str) -> Result<()> {
        let mut stored = self.load(id).await?;
        stored.document.clear();
        stored.document.revision = Uuid::new_v4().to_string();
        self.save(id, &stored).await
    }

    fn document_url(&self, id: &str) -> String {
        format!("file://{}", self.document_path(id).display())
    }
}
