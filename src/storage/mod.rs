use crate::errors::ServiceError;
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::debug;
use uuid::Uuid;

/// Durable storage for uploaded files. A trait seam so the checkout flow can
/// be exercised against a failing store: a storage failure must be
/// indistinguishable from a persistence failure to the caller.
#[async_trait]
pub trait ProofStore: Send + Sync {
    /// Persists `bytes` under the given logical folder and returns the stored
    /// path relative to the storage root.
    async fn store(
        &self,
        folder: &str,
        extension: &str,
        bytes: &[u8],
    ) -> Result<String, ServiceError>;
}

/// Filesystem-backed store rooted at the configured upload directory.
#[derive(Debug, Clone)]
pub struct DiskProofStore {
    root: PathBuf,
}

impl DiskProofStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &PathBuf {
        &self.root
    }
}

#[async_trait]
impl ProofStore for DiskProofStore {
    async fn store(
        &self,
        folder: &str,
        extension: &str,
        bytes: &[u8],
    ) -> Result<String, ServiceError> {
        let dir = self.root.join(folder);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| ServiceError::StorageError(format!("creating {:?}: {}", dir, e)))?;

        let filename = format!("{}.{}", Uuid::new_v4(), extension);
        let path = dir.join(&filename);
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| ServiceError::StorageError(format!("writing {:?}: {}", path, e)))?;

        debug!(?path, size = bytes.len(), "stored uploaded file");
        Ok(format!("{}/{}", folder, filename))
    }
}
