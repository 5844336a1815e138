//! BlobStore — one logical bucket of string blobs keyed by path.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;
use tracing::debug;

use crate::error::{StoreError, StoreResult};

/// String-blob storage keyed by slash-separated paths.
///
/// `get` on a missing key is `Ok(None)`, never an error; errors are
/// reserved for underlying I/O faults.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;
    async fn put(&self, key: &str, content: &str) -> StoreResult<()>;
}

/// Filesystem-backed blob store rooted at a directory.
///
/// Keys map to paths under the root; `put` creates intermediate
/// directories and replaces the file atomically via a rename.
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let path = self.path_for(key);
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::Read(key.to_string(), e.to_string())),
        }
    }

    async fn put(&self, key: &str, content: &str) -> StoreResult<()> {
        let path = self.path_for(key);
        let map_write = |e: std::io::Error| StoreError::Write(key.to_string(), e.to_string());

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(map_write)?;
        }

        // Write to a sibling temp file, then rename over the target so
        // readers never observe a half-written blob.
        let tmp = path.with_extension("tmp");
        tokio::fs::write(&tmp, content).await.map_err(map_write)?;
        tokio::fs::rename(&tmp, &path).await.map_err(map_write)?;

        debug!(key, bytes = content.len(), "blob written");
        Ok(())
    }
}

/// In-memory blob store for tests.
#[derive(Default)]
pub struct MemBlobStore {
    blobs: Mutex<HashMap<String, String>>,
}

impl MemBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all keys currently stored (test helper).
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.blobs.lock().expect("blobs lock").keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl BlobStore for MemBlobStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.blobs.lock().expect("blobs lock").get(key).cloned())
    }

    async fn put(&self, key: &str, content: &str) -> StoreResult<()> {
        self.blobs
            .lock()
            .expect("blobs lock")
            .insert(key.to_string(), content.to_string());
        Ok(())
    }
}
