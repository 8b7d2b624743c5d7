//! Filesystem-backed object store
//!
//! A key is a path. Listing a file yields that file; listing a directory
//! yields every regular file below it, recursively, skipping hidden entries.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;

use super::storage::ObjectStore;
use crate::data::error::DataError;

/// Filesystem-backed object store
#[derive(Debug, Clone, Default)]
pub struct FilesystemStore;

impl FilesystemStore {
    pub fn new() -> Self {
        Self
    }

    fn is_hidden(path: &std::path::Path) -> bool {
        path.file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with('.'))
    }
}

#[async_trait]
impl ObjectStore for FilesystemStore {
    fn name(&self) -> &'static str {
        "filesystem"
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, DataError> {
        let root = PathBuf::from(prefix);
        let metadata = match fs::metadata(&root).await {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        if metadata.is_file() {
            return Ok(vec![root.to_string_lossy().into_owned()]);
        }

        let mut keys = Vec::new();
        let mut pending = vec![root];

        while let Some(dir) = pending.pop() {
            let mut entries = fs::read_dir(&dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                if Self::is_hidden(&path) {
                    continue;
                }
                let file_type = entry.file_type().await?;
                if file_type.is_dir() {
                    pending.push(path);
                } else if file_type.is_file() {
                    keys.push(path.to_string_lossy().into_owned());
                }
            }
        }

        keys.sort();
        tracing::trace!(prefix, objects = keys.len(), "Listed filesystem objects");
        Ok(keys)
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, DataError> {
        match fs::read(key).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(DataError::NotFound(key.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}
