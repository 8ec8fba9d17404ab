use std::path::{Component, Path, PathBuf};

use anyhow::Context;
use async_trait::async_trait;
use bytes::Bytes;
use time::OffsetDateTime;
use tokio::fs;
use tracing::{debug, warn};

/// Result of a successful write.
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub key: String,
    pub path: String,
    pub size: u64,
}

/// One stored file as seen by a listing.
#[derive(Debug, Clone)]
pub struct ObjectInfo {
    pub key: String,
    pub path: String,
    pub size: u64,
    pub created_at: OffsetDateTime,
}

#[async_trait]
pub trait StorageClient: Send + Sync {
    /// Writes `body` under `key` (a `/`-separated relative path), replacing any existing object.
    async fn put_object(&self, key: &str, body: Bytes) -> anyhow::Result<StoredObject>;

    /// Lists every object below `prefix`. `None` when nothing was ever stored there.
    async fn list_objects(&self, prefix: &str) -> anyhow::Result<Option<Vec<ObjectInfo>>>;
}

/// Local-disk object store rooted at a directory.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, key: &str) -> anyhow::Result<PathBuf> {
        let rel = Path::new(key);
        let safe = rel
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        anyhow::ensure!(safe && !key.is_empty(), "invalid object key {key:?}");
        Ok(self.root.join(rel))
    }
}

#[async_trait]
impl StorageClient for LocalStorage {
    async fn put_object(&self, key: &str, body: Bytes) -> anyhow::Result<StoredObject> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("create directory {}", parent.display()))?;
        }

        // Keys are second-granular; a same-second re-upload replaces the earlier file.
        if fs::try_exists(&path).await.unwrap_or(false) {
            warn!(path = %path.display(), "overwriting existing upload");
        }

        fs::write(&path, &body)
            .await
            .with_context(|| format!("write {}", path.display()))?;
        let size = fs::metadata(&path)
            .await
            .with_context(|| format!("stat {}", path.display()))?
            .len();

        debug!(key, size, "object stored");
        Ok(StoredObject {
            key: key.to_string(),
            path: path.display().to_string(),
            size,
        })
    }

    async fn list_objects(&self, prefix: &str) -> anyhow::Result<Option<Vec<ObjectInfo>>> {
        let base = self.resolve(prefix)?;
        if !fs::try_exists(&base).await.unwrap_or(false) {
            return Ok(None);
        }

        let mut out = Vec::new();
        let mut pending = vec![base];
        while let Some(dir) = pending.pop() {
            let mut entries = fs::read_dir(&dir)
                .await
                .with_context(|| format!("read directory {}", dir.display()))?;
            while let Some(entry) = entries.next_entry().await? {
                let meta = entry.metadata().await?;
                let path = entry.path();
                if meta.is_dir() {
                    pending.push(path);
                    continue;
                }
                if !meta.is_file() {
                    continue;
                }
                let created = meta.created().or_else(|_| meta.modified())?;
                let key = path
                    .strip_prefix(&self.root)
                    .unwrap_or(&path)
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect::<Vec<_>>()
                    .join("/");
                out.push(ObjectInfo {
                    key,
                    path: path.display().to_string(),
                    size: meta.len(),
                    created_at: OffsetDateTime::from(created),
                });
            }
        }

        out.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(Some(out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_creates_directories_and_reports_size() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path());

        let stored = storage
            .put_object("7/resumes/20250101_120000_cv.pdf", Bytes::from_static(b"%PDF-1.4"))
            .await
            .unwrap();

        assert_eq!(stored.size, 8);
        assert!(dir.path().join("7/resumes/20250101_120000_cv.pdf").is_file());
        assert!(stored.path.ends_with("20250101_120000_cv.pdf"));
    }

    #[tokio::test]
    async fn same_key_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path());
        let key = "1/images/20250101_120000_a.png";

        storage.put_object(key, Bytes::from_static(b"first")).await.unwrap();
        let second = storage.put_object(key, Bytes::from_static(b"2nd")).await.unwrap();

        assert_eq!(second.size, 3);
        let listed = storage.list_objects("1").await.unwrap().unwrap();
        assert_eq!(listed.len(), 1);
    }

    #[tokio::test]
    async fn list_missing_prefix_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path());
        assert!(storage.list_objects("42").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_walks_nested_directories() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path());
        storage.put_object("3/resumes/a.pdf", Bytes::from_static(b"a")).await.unwrap();
        storage.put_object("3/images/b.png", Bytes::from_static(b"bb")).await.unwrap();
        storage.put_object("4/images/c.png", Bytes::from_static(b"c")).await.unwrap();

        let listed = storage.list_objects("3").await.unwrap().unwrap();
        let keys: Vec<_> = listed.iter().map(|o| o.key.as_str()).collect();
        assert_eq!(keys, vec!["3/images/b.png", "3/resumes/a.pdf"]);
    }

    #[tokio::test]
    async fn traversal_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path());
        assert!(storage
            .put_object("../escape.txt", Bytes::from_static(b"x"))
            .await
            .is_err());
        assert!(storage.put_object("/etc/passwd", Bytes::new()).await.is_err());
    }
}
