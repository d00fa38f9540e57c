use crate::keys::validate_key;
use crate::traits::{Storage, StorageError, StorageResult, StoredObject};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Local filesystem storage implementation
#[derive(Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
    base_url: String,
}

impl LocalStorage {
    /// Create a new LocalStorage instance
    ///
    /// # Arguments
    /// * `base_path` - Root directory for blobs (e.g., "/var/lib/snaphub/uploads")
    /// * `base_url` - Base URL the directory is served under (e.g., "http://localhost:4000/files")
    pub async fn new(base_path: impl Into<PathBuf>, base_url: String) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalStorage {
            base_path,
            base_url,
        })
    }

    fn key_to_path(&self, storage_key: &str) -> StorageResult<PathBuf> {
        validate_key(storage_key)?;
        Ok(storage_key
            .split('/')
            .fold(self.base_path.clone(), |path, segment| path.join(segment)))
    }

    fn path_to_key(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.base_path).ok()?;
        let segments: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        Some(segments.join("/"))
    }

    async fn ensure_parent_dir(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn put(&self, storage_key: &str, data: Bytes, _content_type: &str) -> StorageResult<()> {
        let path = self.key_to_path(storage_key)?;
        let size = data.len();

        self.ensure_parent_dir(&path).await?;

        let start = std::time::Instant::now();

        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::AlreadyExists => StorageError::AlreadyExists(storage_key.to_string()),
                _ => StorageError::UploadFailed(format!(
                    "Failed to create file {}: {}",
                    path.display(),
                    e
                )),
            })?;

        file.write_all(&data).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to write file {}: {}", path.display(), e))
        })?;

        file.sync_all().await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to sync file {}: {}", path.display(), e))
        })?;

        tracing::info!(
            path = %path.display(),
            key = %storage_key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage put successful"
        );

        Ok(())
    }

    async fn remove(&self, storage_key: &str) -> StorageResult<()> {
        let path = self.key_to_path(storage_key)?;
        let start = std::time::Instant::now();

        match fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => {
                return Err(StorageError::DeleteFailed(format!(
                    "Failed to delete file {}: {}",
                    path.display(),
                    e
                )))
            }
        }

        tracing::info!(
            path = %path.display(),
            key = %storage_key,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage delete successful"
        );

        Ok(())
    }

    fn public_url(&self, storage_key: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), storage_key)
    }

    async fn exists(&self, storage_key: &str) -> StorageResult<bool> {
        let path = self.key_to_path(storage_key)?;
        Ok(fs::try_exists(&path).await.unwrap_or(false))
    }

    async fn list(&self, prefix: Option<&str>) -> StorageResult<Vec<StoredObject>> {
        let root = match prefix {
            Some(p) => self.key_to_path(p.trim_end_matches('/'))?,
            None => self.base_path.clone(),
        };

        let mut objects = Vec::new();
        let mut pending = vec![root];

        while let Some(dir) = pending.pop() {
            let mut entries = match fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(StorageError::IoError(e)),
            };

            while let Some(entry) = entries.next_entry().await? {
                let metadata = entry.metadata().await?;
                let path = entry.path();
                if metadata.is_dir() {
                    pending.push(path);
                    continue;
                }
                let Some(key) = self.path_to_key(&path) else {
                    continue;
                };
                let last_modified = metadata
                    .modified()
                    .map(DateTime::<Utc>::from)
                    .unwrap_or_else(|_| Utc::now());
                objects.push(StoredObject {
                    key,
                    size: metadata.len(),
                    last_modified,
                });
            }
        }

        objects.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(objects)
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}

#[cfg(all(test, feature = "storage-local"))]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn storage(dir: &Path) -> LocalStorage {
        LocalStorage::new(dir, "http://localhost:4000/files/".to_string())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_local_storage_put_and_exists() {
        let dir = tempdir().unwrap();
        let storage = storage(dir.path()).await;

        storage
            .put("42/1000_0_a.jpg", Bytes::from_static(b"jpeg"), "image/jpeg")
            .await
            .unwrap();

        assert!(storage.exists("42/1000_0_a.jpg").await.unwrap());
        assert!(!storage.exists("42/1000_1_b_png").await.unwrap());
        let written = std::fs::read(dir.path().join("42").join("1000_0_a.jpg")).unwrap();
        assert_eq!(written, b"jpeg");
    }

    #[tokio::test]
    async fn test_put_never_overwrites() {
        let dir = tempdir().unwrap();
        let storage = storage(dir.path()).await;

        storage
            .put("1/1_0_x.png", Bytes::from_static(b"first"), "image/png")
            .await
            .unwrap();
        let second = storage
            .put("1/1_0_x.png", Bytes::from_static(b"second"), "image/png")
            .await;

        assert!(matches!(second, Err(StorageError::AlreadyExists(_))));
        let kept = std::fs::read(dir.path().join("1").join("1_0_x.png")).unwrap();
        assert_eq!(kept, b"first");
    }

    #[tokio::test]
    async fn test_path_traversal_rejected() {
        let dir = tempdir().unwrap();
        let storage = storage(dir.path()).await;

        let result = storage
            .put("../../../etc/passwd", Bytes::new(), "text/plain")
            .await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));

        let result = storage.remove("../etc/passwd").await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));

        let result = storage.exists("/etc/passwd").await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));
    }

    #[tokio::test]
    async fn test_local_storage_remove_nonexistent() {
        let dir = tempdir().unwrap();
        let storage = storage(dir.path()).await;

        assert!(storage.remove("nonexistent/file.txt").await.is_ok());
    }

    #[tokio::test]
    async fn test_remove_many_deletes_all_keys() {
        let dir = tempdir().unwrap();
        let storage = storage(dir.path()).await;

        for key in ["5/1_0_a.jpg", "5/1_1_b.jpg"] {
            storage.put(key, Bytes::from_static(b"x"), "image/jpeg").await.unwrap();
        }
        storage
            .remove_many(&["5/1_0_a.jpg".to_string(), "5/1_1_b.jpg".to_string()])
            .await
            .unwrap();

        assert!(storage.list(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_walks_nested_directories() {
        let dir = tempdir().unwrap();
        let storage = storage(dir.path()).await;

        storage.put("1/10_0_a.jpg", Bytes::from_static(b"aa"), "image/jpeg").await.unwrap();
        storage.put("2/20_0_b.jpg", Bytes::from_static(b"b"), "image/jpeg").await.unwrap();

        let all = storage.list(None).await.unwrap();
        let keys: Vec<&str> = all.iter().map(|o| o.key.as_str()).collect();
        assert_eq!(keys, vec!["1/10_0_a.jpg", "2/20_0_b.jpg"]);
        assert_eq!(all[0].size, 2);

        let only_two = storage.list(Some("2")).await.unwrap();
        assert_eq!(only_two.len(), 1);
        assert_eq!(only_two[0].key, "2/20_0_b.jpg");

        assert!(storage.list(Some("99")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_public_url_joins_base_url() {
        let dir = tempdir().unwrap();
        let storage = storage(dir.path()).await;

        assert_eq!(
            storage.public_url("42/1000_0_a.jpg"),
            "http://localhost:4000/files/42/1000_0_a.jpg"
        );
    }
}
