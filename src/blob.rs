//! Object-store boundary.
//!
//! The pipeline and analyzer only ever see the [`BlobStore`] trait; the
//! directory-backed [`FsBlobStore`] ships with the crate for local operation
//! and tests. Hosted backends (S3, Azure Blob, …) implement the same trait
//! and append their own signed-access suffix in [`BlobStore::url`].

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::error::{IngestError, Result};

/// Durable reference to a stored blob. Only meaningful to the store that
/// issued it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobRef {
    pub key: String,
}

impl BlobRef {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Streams a local file into the store under `key` and returns the
    /// durable reference. Overwrites an existing blob at the same key.
    async fn put(&self, key: &str, local: &Path) -> Result<BlobRef>;

    /// Makes the blob readable as a local path. Range reads are the
    /// implementation's concern; callers hand the path to an engine.
    async fn open(&self, blob: &BlobRef) -> Result<PathBuf>;

    /// Deletes a blob. Deleting a missing blob is not an error.
    async fn delete(&self, blob: &BlobRef) -> Result<()>;

    /// A URL resolvable by an analytical engine, with any required
    /// signed-access suffix already appended.
    fn url(&self, blob: &BlobRef) -> String;
}

/// Directory-backed store.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn blob_path(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn put(&self, key: &str, local: &Path) -> Result<BlobRef> {
        let dest = self.blob_path(key);
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|err| IngestError::Blob(format!("creating {parent:?}: {err}")))?;
        }
        let bytes = tokio::fs::copy(local, &dest)
            .await
            .map_err(|err| IngestError::Blob(format!("storing {key}: {err}")))?;
        info!("Stored blob '{key}' ({bytes} bytes)");
        Ok(BlobRef::new(key))
    }

    async fn open(&self, blob: &BlobRef) -> Result<PathBuf> {
        let path = self.blob_path(&blob.key);
        tokio::fs::metadata(&path)
            .await
            .map_err(|err| IngestError::Blob(format!("opening {}: {err}", blob.key)))?;
        Ok(path)
    }

    async fn delete(&self, blob: &BlobRef) -> Result<()> {
        let path = self.blob_path(&blob.key);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!("Deleted blob '{}'", blob.key);
                Ok(())
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(IngestError::Blob(format!(
                "deleting {}: {err}",
                blob.key
            ))),
        }
    }

    fn url(&self, blob: &BlobRef) -> String {
        format!("file://{}", self.blob_path(&blob.key).display())
    }
}
