//! Persisted per-folder sync metadata.
//!
//! One JSON file per linked folder, at a fixed reserved filename inside
//! that folder. The file is the only durable state the engine keeps: the
//! fingerprints of the last successfully synced local tree and remote
//! rendering, plus the remote revision token. It is written pretty-printed
//! so users can inspect it.

use crate::fs::{FileSystem, FsError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;
use tracing::warn;

/// Reserved filename, excluded from tree building and the remote document.
pub const METADATA_FILENAME: &str = ".docsync.json";

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("Filesystem error: {0}")]
    Fs(#[from] FsError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, MetadataError>;

/// Last-known remote content fingerprint.
///
/// `Unknown` means the hash was never computed (metadata predates it or the
/// link was just created without a fetch), which is distinct from an empty
/// remote document. An unknown hash always counts as "remote changed".
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RemoteHash {
    #[default]
    Unknown,
    Known(String),
}

impl RemoteHash {
    pub fn is_unknown(&self) -> bool {
        matches!(self, RemoteHash::Unknown)
    }

    pub fn known(&self) -> Option<&str> {
        match self {
            RemoteHash::Unknown => None,
            RemoteHash::Known(hash) => Some(hash),
        }
    }
}

// On disk the tri-state is an optional string: absent/null = Unknown.
impl Serialize for RemoteHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.known().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for RemoteHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        Ok(match Option::<String>::deserialize(deserializer)? {
            Some(hash) => RemoteHash::Known(hash),
            None => RemoteHash::Unknown,
        })
    }
}

/// Sync state persisted per linked folder.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncMetadata {
    pub remote_id: String,
    pub last_sync_time: DateTime<Utc>,
    pub folder_path: String,
    pub local_content_hash: String,
    #[serde(default, skip_serializing_if = "RemoteHash::is_unknown")]
    pub remote_content_hash: RemoteHash,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_revision: Option<String>,
}

/// Build fresh metadata for a new link, stamped with the current time.
pub fn create(
    remote_id: &str,
    folder_path: &str,
    local_hash: &str,
    remote_revision: Option<String>,
) -> SyncMetadata {
    SyncMetadata {
        remote_id: remote_id.to_string(),
        last_sync_time: Utc::now(),
        folder_path: folder_path.to_string(),
        local_content_hash: local_hash.to_string(),
        remote_content_hash: RemoteHash::Unknown,
        remote_revision,
    }
}

/// Path of the metadata file for a folder.
pub fn path(folder: &str) -> String {
    if folder.is_empty() {
        METADATA_FILENAME.to_string()
    } else {
        format!("{}/{}", folder.trim_end_matches('/'), METADATA_FILENAME)
    }
}

pub async fn exists<F: FileSystem>(fs: &F, folder: &str) -> Result<bool> {
    Ok(fs.exists(&path(folder)).await?)
}

/// Read metadata for a folder. Missing or corrupt files yield `None`;
/// corruption is logged, never raised, and the folder is treated as
/// unlinked.
pub async fn read<F: FileSystem>(fs: &F, folder: &str) -> Result<Option<SyncMetadata>> {
    let file = path(folder);
    if !fs.exists(&file).await? {
        return Ok(None);
    }
    let bytes = fs.read(&file).await?;
    match serde_json::from_slice::<SyncMetadata>(&bytes) {
        Ok(metadata) => Ok(Some(metadata)),
        Err(e) => {
            warn!("Corrupt sync metadata at {}: {}", file, e);
            Ok(None)
        }
    }
}

/// Create or overwrite the metadata file, pretty-printed.
pub async fn write<F: FileSystem>(fs: &F, folder: &str, metadata: &SyncMetadata) -> Result<()> {
    let json = serde_json::to_vec_pretty(metadata)?;
    fs.write(&path(folder), &json).await?;
    Ok(())
}

/// Remove the metadata file. No-op if absent.
pub async fn delete<F: FileSystem>(fs: &F, folder: &str) -> Result<()> {
    let file = path(folder);
    if fs.exists(&file).await? {
        fs.delete(&file).await?;
    }
    Ok(())
}
