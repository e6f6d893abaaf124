//! Native filesystem implementation using tokio::fs.

use async_trait::async_trait;
use std::path::PathBuf;
use sync_core::fs::{FileEntry, FileSystem, FsError, Result};
use tokio::fs;

/// Native filesystem rooted at a base directory. All trait paths are
/// relative to that root.
pub struct NativeFs {
    base_path: PathBuf,
}

impl NativeFs {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn full_path(&self, path: &str) -> PathBuf {
        if path.is_empty() {
            self.base_path.clone()
        } else {
            self.base_path.join(path)
        }
    }
}

#[async_trait]
impl FileSystem for NativeFs {
    async fn read(&self, path: &str) -> Result<Vec<u8>> {
        let full_path = self.full_path(path);
        fs::read(&full_path)
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => FsError::NotFound(path.to_string()),
                _ => FsError::Io(e.to_string()),
            })
    }

    async fn write(&self, path: &str, content: &[u8]) -> Result<()> {
        let full_path = self.full_path(path);

        // Create parent directories if needed
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| FsError::Io(e.to_string()))?;
        }

        fs::write(&full_path, content)
            .await
            .map_err(|e| FsError::Io(e.to_string()))
    }

    async fn list(&self, path: &str) -> Result<Vec<FileEntry>> {
        let full_path = self.full_path(path);
        let mut entries = Vec::new();

        let mut dir = fs::read_dir(&full_path)
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => FsError::NotFound(path.to_string()),
                _ => FsError::Io(e.to_string()),
            })?;

        while let Some(entry) = dir
            .next_entry()
            .await
            .map_err(|e| FsError::Io(e.to_string()))?
        {
            let name = entry.file_name().to_string_lossy().to_string();
            let metadata = entry
                .metadata()
                .await
                .map_err(|e| FsError::Io(e.to_string()))?;

            entries.push(FileEntry {
                name,
                is_dir: metadata.is_dir(),
            });
        }

        Ok(entries)
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let full_path = self.full_path(path);

        let metadata = fs::metadata(&full_path)
            .await
            .map_err(|_| FsError::NotFound(path.to_string()))?;

        if metadata.is_dir() {
            fs::remove_dir(&full_path)
                .await
                .map_err(|e| FsError::Io(e.to_string()))
        } else {
            fs::remove_file(&full_path)
                .await
                .map_err(|e| FsError::Io(e.to_string()))
        }
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        Ok(fs::try_exists(self.full_path(path))
            .await
            .map_err(|e| FsError::Io(e.to_string()))?)
    }

    async fn mkdir(&self, path: &str) -> Result<()> {
        fs::create_dir_all(self.full_path(path))
            .await
            .map_err(|e| FsError::Io(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_read_write_roundtrip() {
        let dir = TempDir::new().unwrap();
        let fs = NativeFs::new(dir.path().to_path_buf());

        fs.write("a/b/note.md", b"content").await.unwrap();
        assert_eq!(fs.read("a/b/note.md").await.unwrap(), b"content");
        assert!(fs.exists("a/b").await.unwrap());
    }

    #[tokio::test]
    async fn test_list_distinguishes_dirs() {
        let dir = TempDir::new().unwrap();
        let fs = NativeFs::new(dir.path().to_path_buf());

        fs.write("root/file.md", b"x").await.unwrap();
        fs.mkdir("root/sub").await.unwrap();

        let mut entries = fs.list("root").await.unwrap();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        assert_eq!(entries.len(), 2);
        assert!(!entries[0].is_dir);
        assert!(entries[1].is_dir);
    }

    #[tokio::test]
    async fn test_missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let fs = NativeFs::new(dir.path().to_path_buf());

        assert!(matches!(
            fs.read("missing.md").await,
            Err(FsError::NotFound(_))
        ));
        assert!(fs.list("missing").await.is_err());
    }

    #[tokio::test]
    async fn test_delete_file_and_dir() {
        let dir = TempDir::new().unwrap();
        let fs = NativeFs::new(dir.path().to_path_buf());

        fs.write("d/f.md", b"x").await.unwrap();
        fs.delete("d/f.md").await.unwrap();
        assert!(!fs.exists("d/f.md").await.unwrap());
        fs.delete("d").await.unwrap();
        assert!(!fs.exists("d").await.unwrap());
    }
}
