// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! File-backed key-value store: one file per key inside a directory.
//!
//! Writes go to a temporary sibling first and are renamed into place so a
//! crash mid-write never leaves a truncated value behind.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

use crate::db::{KeyValueStore, StoreError};

/// Durable store rooted at a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Create the store, creating `root` if needed.
    pub async fn new<P: AsRef<Path>>(root: P) -> Result<Self, StoreError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).await?;
        tracing::info!(path = %root.display(), "File store ready");
        Ok(Self { root })
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(format!("{}.json", key)))
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let path = self.path_for(key)?;
        match fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, &value).await?;
        fs::rename(&tmp, &path).await?;
        tracing::debug!(key, bytes = value.len(), "Persisted value");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_key_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path()).await.unwrap();
        assert!(store.get("activities").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("nested")).await.unwrap();

        store.set("activities", b"[1,2]".to_vec()).await.unwrap();
        store.set("activities", b"[3]".to_vec()).await.unwrap();

        assert_eq!(store.get("activities").await.unwrap(), Some(b"[3]".to_vec()));
        assert!(!dir.path().join("nested/activities.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_rejects_path_traversal_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path()).await.unwrap();
        let err = store.set("../escape", vec![]).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidKey(_)));
    }
}
