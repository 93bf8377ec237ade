//! JSON-file implementation of [`LocalStore`].

use std::io;
use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::Value;
use tokio::fs;

use super::local::{LocalStore, StorageError};

/// Stores each key as a JSON file under a data directory.
///
/// Keys may contain characters that are not filesystem-safe (the sync
/// engine uses `sync_queue:<user_id>`), so they are sanitized before
/// being used as filenames.
#[derive(Clone)]
pub struct FileStore {
    data_dir: PathBuf,
}

impl FileStore {
    /// Creates a new store rooted at `data_dir`.
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    /// Returns the data directory path.
    pub fn data_dir(&self) -> &PathBuf {
        &self.data_dir
    }

    /// Returns the full path backing a key.
    pub fn path(&self, key: &str) -> PathBuf {
        self.data_dir.join(format!("{}.json", sanitize(key)))
    }
}

fn sanitize(key: &str) -> String {
    key.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '.' { c } else { '_' })
        .collect()
}

#[async_trait]
impl LocalStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        let path = self.path(key);

        match fs::read(&path).await {
            Ok(bytes) => {
                let value = serde_json::from_slice(&bytes)
                    .map_err(|e| StorageError::ParseError(path, e.to_string()))?;
                Ok(Some(value))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::IoError(path, e)),
        }
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StorageError> {
        fs::create_dir_all(&self.data_dir)
            .await
            .map_err(|e| StorageError::IoError(self.data_dir.clone(), e))?;

        let path = self.path(key);
        let bytes = serde_json::to_vec_pretty(&value)
            .map_err(|e| StorageError::ParseError(path.clone(), e.to_string()))?;

        fs::write(&path, bytes)
            .await
            .map_err(|e| StorageError::IoError(path, e))?;

        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path(key);

        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::IoError(path, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn test_store() -> (FileStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path().to_path_buf());
        (store, temp_dir)
    }

    #[test]
    fn test_path_sanitizes_key() {
        let (store, _temp) = test_store();
        let path = store.path("sync_queue:user/1");
        assert!(path.ends_with("sync_queue_user_1.json"));
    }

    #[tokio::test]
    async fn test_get_nonexistent_returns_none() {
        let (store, _temp) = test_store();
        let result = store.get("missing").await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_set_creates_directory() {
        let temp_dir = TempDir::new().unwrap();
        let nested_dir = temp_dir.path().join("nested").join("data");
        let store = FileStore::new(nested_dir.clone());

        store.set("key", json!({"a": 1})).await.unwrap();

        assert!(nested_dir.exists());
        assert!(store.path("key").exists());
    }

    #[tokio::test]
    async fn test_set_and_get_roundtrip() {
        let (store, _temp) = test_store();

        let value = json!({"ops": [1, 2, 3], "name": "queue"});
        store.set("sync_queue:user1", value.clone()).await.unwrap();

        let loaded = store.get("sync_queue:user1").await.unwrap();
        assert_eq!(loaded, Some(value));
    }

    #[tokio::test]
    async fn test_set_overwrites() {
        let (store, _temp) = test_store();

        store.set("key", json!(1)).await.unwrap();
        store.set("key", json!(2)).await.unwrap();

        let loaded = store.get("key").await.unwrap();
        assert_eq!(loaded, Some(json!(2)));
    }

    #[tokio::test]
    async fn test_remove() {
        let (store, _temp) = test_store();

        store.set("key", json!(true)).await.unwrap();
        store.remove("key").await.unwrap();

        assert!(store.get("key").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_remove_nonexistent_is_noop() {
        let (store, _temp) = test_store();
        store.remove("missing").await.unwrap();
    }

    #[tokio::test]
    async fn test_get_invalid_json_errors() {
        let (store, _temp) = test_store();
        std::fs::create_dir_all(store.data_dir()).unwrap();
        std::fs::write(store.path("bad"), b"not json").unwrap();

        let result = store.get("bad").await;
        assert!(matches!(result, Err(StorageError::ParseError(_, _))));
    }
}
