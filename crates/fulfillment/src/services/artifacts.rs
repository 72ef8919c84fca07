//! Artifact store trait with in-memory and filesystem implementations.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;

/// Errors raised by an artifact store.
#[derive(Debug, Error)]
pub enum ArtifactError {
    /// The key would escape the store's root or is empty.
    #[error("Invalid artifact key: {0}")]
    InvalidKey(String),

    #[error("Artifact store unavailable: {0}")]
    Unavailable(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Durable storage for rendered documents.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Stores `bytes` under `key` and returns a locator clients can use.
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str)
    -> Result<String, ArtifactError>;

    /// Removes the artifact under `key`. Removing a missing key succeeds.
    async fn delete(&self, key: &str) -> Result<(), ArtifactError>;
}

#[async_trait]
impl<T: ArtifactStore + ?Sized> ArtifactStore for Arc<T> {
    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, ArtifactError> {
        (**self).put(key, bytes, content_type).await
    }

    async fn delete(&self, key: &str) -> Result<(), ArtifactError> {
        (**self).delete(key).await
    }
}

/// A stored artifact, as seen by the in-memory store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredArtifact {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

#[derive(Debug, Default)]
struct InMemoryArtifactState {
    artifacts: HashMap<String, StoredArtifact>,
    fail_on_put: bool,
    fail_on_delete: bool,
    put_delay: Option<Duration>,
}

/// In-memory artifact store for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryArtifactStore {
    state: Arc<RwLock<InMemoryArtifactState>>,
}

impl InMemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the store to fail every put call.
    pub async fn set_fail_on_put(&self, fail: bool) {
        self.state.write().await.fail_on_put = fail;
    }

    /// Configures the store to fail every delete call.
    pub async fn set_fail_on_delete(&self, fail: bool) {
        self.state.write().await.fail_on_delete = fail;
    }

    /// Makes every put call sleep before storing.
    pub async fn set_put_delay(&self, delay: Option<Duration>) {
        self.state.write().await.put_delay = delay;
    }

    pub async fn artifact_count(&self) -> usize {
        self.state.read().await.artifacts.len()
    }

    pub async fn get(&self, key: &str) -> Option<StoredArtifact> {
        self.state.read().await.artifacts.get(key).cloned()
    }
}

#[async_trait]
impl ArtifactStore for InMemoryArtifactStore {
    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, ArtifactError> {
        let delay = {
            let state = self.state.read().await;
            if state.fail_on_put {
                return Err(ArtifactError::Unavailable(
                    "simulated upload failure".to_string(),
                ));
            }
            state.put_delay
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.state.write().await.artifacts.insert(
            key.to_string(),
            StoredArtifact {
                bytes,
                content_type: content_type.to_string(),
            },
        );
        Ok(format!("mem://{key}"))
    }

    async fn delete(&self, key: &str) -> Result<(), ArtifactError> {
        let mut state = self.state.write().await;
        if state.fail_on_delete {
            return Err(ArtifactError::Unavailable(
                "simulated delete failure".to_string(),
            ));
        }
        state.artifacts.remove(key);
        Ok(())
    }
}

/// Artifact store writing files below a root directory.
///
/// Locators are `<base_url>/<key>`.
#[derive(Debug, Clone)]
pub struct FileSystemArtifactStore {
    root: PathBuf,
    base_url: String,
}

impl FileSystemArtifactStore {
    pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, ArtifactError> {
        let relative = Path::new(key);
        let well_formed = !key.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !well_formed {
            return Err(ArtifactError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ArtifactStore for FileSystemArtifactStore {
    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, ArtifactError> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;

        tracing::debug!(key, content_type, path = %path.display(), "artifact written");
        Ok(format!("{}/{key}", self.base_url))
    }

    async fn delete(&self, key: &str) -> Result<(), ArtifactError> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_put_and_delete() {
        let store = InMemoryArtifactStore::new();
        let locator = store
            .put("receipts/a.txt", b"hello".to_vec(), "text/plain")
            .await
            .unwrap();
        assert_eq!(locator, "mem://receipts/a.txt");
        assert_eq!(store.get("receipts/a.txt").await.unwrap().bytes, b"hello");

        store.delete("receipts/a.txt").await.unwrap();
        assert_eq!(store.artifact_count().await, 0);
        store.delete("receipts/a.txt").await.unwrap();
    }

    #[tokio::test]
    async fn test_in_memory_failures() {
        let store = InMemoryArtifactStore::new();
        store.set_fail_on_put(true).await;
        assert!(store.put("k", vec![], "text/plain").await.is_err());

        store.set_fail_on_delete(true).await;
        assert!(matches!(
            store.delete("k").await,
            Err(ArtifactError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_filesystem_round_trip() {
        let root = std::env::temp_dir().join(format!("artifacts-{}", common::SaleId::new()));
        let store = FileSystemArtifactStore::new(&root, "https://files.example.com/");

        let locator = store
            .put("receipts/sale_1.txt", b"receipt".to_vec(), "text/plain")
            .await
            .unwrap();
        assert_eq!(locator, "https://files.example.com/receipts/sale_1.txt");

        let written = tokio::fs::read(root.join("receipts/sale_1.txt")).await.unwrap();
        assert_eq!(written, b"receipt");

        store.delete("receipts/sale_1.txt").await.unwrap();
        assert!(!root.join("receipts/sale_1.txt").exists());
        store.delete("receipts/sale_1.txt").await.unwrap();

        tokio::fs::remove_dir_all(&root).await.unwrap();
    }

    #[tokio::test]
    async fn test_filesystem_rejects_escaping_keys() {
        let store = FileSystemArtifactStore::new(std::env::temp_dir(), "file:///tmp");
        for key in ["", "../etc/passwd", "/abs/path", "a/../../b"] {
            assert!(matches!(
                store.put(key, vec![], "text/plain").await,
                Err(ArtifactError::InvalidKey(_))
            ));
        }
    }
}
