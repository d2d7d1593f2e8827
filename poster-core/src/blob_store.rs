//! Blob Storage Abstraction
//!
//! Abstract interface for storing tiles and poster versions.
//! Paths are relative and slash-separated (`posters/000003-ab12.png`).

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::{Component, Path, PathBuf};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::StoreError;

pub const PNG: &str = "image/png";

/// Abstract blob storage for poster artifacts
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store binary content under `path`, return a locator for `publish`
    async fn upload(&self, path: &str, content: &[u8], content_type: &str)
        -> Result<String, StoreError>;

    /// Fetch binary content by path
    async fn download(&self, path: &str) -> Result<Vec<u8>, StoreError>;

    /// Make an uploaded blob publicly readable, return its public URL
    async fn publish(&self, locator: &str) -> Result<String, StoreError>;

    /// Check if a blob exists
    async fn exists(&self, path: &str) -> Result<bool, StoreError>;
}

/// Reject absolute paths and parent traversal so keys can't escape the root.
fn checked_path(path: &str) -> Result<&Path, StoreError> {
    let p = Path::new(path);
    let clean = !path.is_empty()
        && p.components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    if clean {
        Ok(p)
    } else {
        Err(StoreError::InvalidPath(path.to_string()))
    }
}

/// Local filesystem implementation. Anything under `base_path` is served
/// as-is by the upload server, so publishing only resolves the URL.
pub struct LocalBlobStore {
    base_path: PathBuf,
    public_base_url: String,
}

impl LocalBlobStore {
    pub fn new(base_path: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            base_path: base_path.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn full_path(&self, path: &str) -> Result<PathBuf, StoreError> {
        Ok(self.base_path.join(checked_path(path)?))
    }

    /// Extract the relative path from a locator (file:// URI)
    fn path_from_locator<'a>(&self, locator: &'a str) -> Result<&'a str, StoreError> {
        let absolute = locator.strip_prefix("file://").ok_or_else(|| {
            StoreError::InvalidPath(format!("expected file:// prefix: {locator}"))
        })?;
        let relative = Path::new(absolute)
            .strip_prefix(&self.base_path)
            .map_err(|_| StoreError::InvalidPath(format!("outside blob root: {locator}")))?;
        relative
            .to_str()
            .ok_or_else(|| StoreError::InvalidPath(locator.to_string()))
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn upload(
        &self,
        path: &str,
        content: &[u8],
        _content_type: &str,
    ) -> Result<String, StoreError> {
        let full = self.full_path(path)?;

        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        // Write-then-rename so a reader never sees a half-written poster.
        // Each write stages under its own name: identical tiles share a path.
        let file_name = full
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("blob");
        let staging =
            full.with_file_name(format!(".{file_name}.{}.partial", Uuid::new_v4().simple()));
        tokio::fs::write(&staging, content).await?;
        if let Err(e) = tokio::fs::rename(&staging, &full).await {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(e.into());
        }
        Ok(format!("file://{}", full.display()))
    }

    async fn download(&self, path: &str) -> Result<Vec<u8>, StoreError> {
        let full = self.full_path(path)?;
        match tokio::fs::read(&full).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::NotFound(path.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn publish(&self, locator: &str) -> Result<String, StoreError> {
        let relative = self.path_from_locator(locator)?;
        if !self.exists(relative).await? {
            return Err(StoreError::NotFound(locator.to_string()));
        }
        let url_path = relative.replace(std::path::MAIN_SEPARATOR, "/");
        Ok(format!("{}/{}", self.public_base_url, url_path))
    }

    async fn exists(&self, path: &str) -> Result<bool, StoreError> {
        let full = self.full_path(path)?;
        Ok(tokio::fs::try_exists(full).await?)
    }
}

/// In-memory blob store (tests and ephemeral runs)
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
    published: RwLock<HashSet<String>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn is_published(&self, path: &str) -> bool {
        self.published.read().await.contains(path)
    }

    pub async fn paths_with_prefix(&self, prefix: &str) -> Vec<String> {
        let mut paths: Vec<String> = self
            .blobs
            .read()
            .await
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        paths.sort();
        paths
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn upload(
        &self,
        path: &str,
        content: &[u8],
        _content_type: &str,
    ) -> Result<String, StoreError> {
        checked_path(path)?;
        let mut blobs = self.blobs.write().await;
        blobs.insert(path.to_string(), content.to_vec());
        Ok(format!("memory://{path}"))
    }

    async fn download(&self, path: &str) -> Result<Vec<u8>, StoreError> {
        let blobs = self.blobs.read().await;
        blobs
            .get(path)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(path.to_string()))
    }

    async fn publish(&self, locator: &str) -> Result<String, StoreError> {
        let path = locator.strip_prefix("memory://").ok_or_else(|| {
            StoreError::InvalidPath(format!("expected memory:// prefix: {locator}"))
        })?;
        if !self.blobs.read().await.contains_key(path) {
            return Err(StoreError::NotFound(locator.to_string()));
        }
        self.published.write().await.insert(path.to_string());
        Ok(format!("memory://public/{path}"))
    }

    async fn exists(&self, path: &str) -> Result<bool, StoreError> {
        Ok(self.blobs.read().await.contains_key(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    #[tokio::test]
    async fn local_blob_store_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalBlobStore::new(temp_dir.path(), "http://localhost:5000/blobs/");

        let content = b"not really a png";
        let locator = store.upload("posters/1.png", content, PNG).await.unwrap();
        assert!(locator.starts_with("file://"));
        assert!(store.exists("posters/1.png").await.unwrap());

        let fetched = store.download("posters/1.png").await.unwrap();
        assert_eq!(fetched, content);

        let url = store.publish(&locator).await.unwrap();
        assert_eq!(url, "http://localhost:5000/blobs/posters/1.png");
    }

    #[tokio::test]
    async fn local_blob_store_overwrite_leaves_no_staging_file() {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalBlobStore::new(temp_dir.path(), "http://x");

        store.upload("a/b/c/tile.png", b"one", PNG).await.unwrap();
        store.upload("a/b/c/tile.png", b"two", PNG).await.unwrap();
        assert_eq!(store.download("a/b/c/tile.png").await.unwrap(), b"two");

        let dir = temp_dir.path().join("a/b/c");
        let names: Vec<_> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec!["tile.png".to_string()]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_identical_uploads_all_succeed() {
        let temp_dir = TempDir::new().unwrap();
        let store = Arc::new(LocalBlobStore::new(temp_dir.path(), "http://x"));

        for _ in 0..20 {
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    let store = store.clone();
                    tokio::spawn(async move {
                        store.upload("tiles/same.png", b"same bytes", PNG).await
                    })
                })
                .collect();
            for handle in handles {
                handle.await.unwrap().unwrap();
            }
        }
        assert_eq!(store.download("tiles/same.png").await.unwrap(), b"same bytes");
    }

    #[tokio::test]
    async fn local_missing_blob_is_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalBlobStore::new(temp_dir.path(), "http://x");
        let result = store.download("starter/poster.png").await;
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn traversal_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalBlobStore::new(temp_dir.path(), "http://x");
        for bad in ["../escape.png", "/etc/passwd", ""] {
            let result = store.upload(bad, b"x", PNG).await;
            assert!(matches!(result, Err(StoreError::InvalidPath(_))), "{bad}");
        }
        let memory = MemoryBlobStore::new();
        assert!(memory.upload("../x", b"x", PNG).await.is_err());
    }

    #[tokio::test]
    async fn local_publish_rejects_foreign_locator() {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalBlobStore::new(temp_dir.path(), "http://x");
        let result = store.publish("file:///tmp/elsewhere.png").await;
        assert!(matches!(result, Err(StoreError::InvalidPath(_))));
    }

    #[tokio::test]
    async fn in_memory_blob_store() {
        let store = MemoryBlobStore::new();

        let locator = store.upload("tiles/t.png", b"tile", PNG).await.unwrap();
        assert_eq!(locator, "memory://tiles/t.png");
        assert!(!store.is_published("tiles/t.png").await);

        let url = store.publish(&locator).await.unwrap();
        assert_eq!(url, "memory://public/tiles/t.png");
        assert!(store.is_published("tiles/t.png").await);
        assert_eq!(store.download("tiles/t.png").await.unwrap(), b"tile");
    }

    #[tokio::test]
    async fn not_found_error() {
        let store = MemoryBlobStore::new();
        let result = store.download("nonexistent").await;
        assert!(matches!(result, Err(StoreError::NotFound(_))));
        let result = store.publish("memory://nonexistent").await;
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }
}
