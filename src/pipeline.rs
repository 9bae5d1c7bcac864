//! Size-aware ingestion of an uploaded temp copy into durable storage.
//!
//! Below the large-file threshold the original bytes are preserved and the
//! columnar conversion runs at the same time — the two tasks read the same
//! read-only temp copy and write to independent destinations. At or above
//! the threshold the double write is skipped: conversion runs directly and
//! the original is uploaded only if conversion fails.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, info, warn};
use uuid::Uuid;

use crate::{
    blob::{BlobRef, BlobStore},
    catalog::StorageFormat,
    convert::convert_to_parquet,
    error::{IngestError, Result},
    resolve::Resolver,
    worker::WorkerPool,
};

pub const DEFAULT_LARGE_FILE_THRESHOLD: u64 = 100 * 1024 * 1024;

#[derive(Debug, Clone, Copy)]
pub struct PipelineConfig {
    /// Uploads at or above this many bytes skip backup preservation.
    pub large_file_threshold: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            large_file_threshold: DEFAULT_LARGE_FILE_THRESHOLD,
        }
    }
}

/// What the pipeline durably produced. The storage format always names an
/// artifact that actually exists in the object store.
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    pub location: BlobRef,
    pub backup_location: Option<BlobRef>,
    pub storage_format: StorageFormat,
    pub size_bytes: u64,
}

pub struct Pipeline {
    resolver: Resolver,
    blobs: Arc<dyn BlobStore>,
    pool: Arc<WorkerPool>,
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(
        resolver: Resolver,
        blobs: Arc<dyn BlobStore>,
        pool: Arc<WorkerPool>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            resolver,
            blobs,
            pool,
            config,
        }
    }

    /// Moves a received temp copy into durable storage and decides the
    /// dataset's storage format. Fails only when no durable artifact could
    /// be written at all.
    pub async fn ingest(
        &self,
        dataset_id: Uuid,
        temp: &Path,
        filename: &str,
        size: u64,
    ) -> Result<IngestOutcome> {
        let original_key = format!("{dataset_id}/{filename}");
        let columnar_key = format!("{dataset_id}/{}.parquet", file_stem(filename));

        if size >= self.config.large_file_threshold {
            info!(
                "Upload of {size} bytes meets the large-file threshold; skipping backup copy"
            );
            match self.convert_and_store(temp, &columnar_key).await {
                Ok(columnar) => Ok(IngestOutcome {
                    location: columnar,
                    backup_location: None,
                    storage_format: StorageFormat::Columnar,
                    size_bytes: size,
                }),
                Err(err) => {
                    warn!(
                        "Conversion failed ({err}); falling back to storing the original bytes"
                    );
                    let original = self.blobs.put(&original_key, temp).await?;
                    Ok(IngestOutcome {
                        location: original,
                        backup_location: None,
                        storage_format: StorageFormat::Delimited,
                        size_bytes: size,
                    })
                }
            }
        } else {
            let (backup, converted) = tokio::join!(
                self.blobs.put(&original_key, temp),
                self.convert_and_store(temp, &columnar_key),
            );
            match (converted, backup) {
                (Ok(columnar), backup) => {
                    let backup_location = match backup {
                        Ok(blob) => Some(blob),
                        Err(err) => {
                            warn!("Backup preservation failed ({err}); keeping columnar artifact only");
                            None
                        }
                    };
                    Ok(IngestOutcome {
                        location: columnar,
                        backup_location,
                        storage_format: StorageFormat::Columnar,
                        size_bytes: size,
                    })
                }
                (Err(err), Ok(original)) => {
                    warn!("Conversion failed ({err}); dataset stays in its original format");
                    Ok(IngestOutcome {
                        location: original,
                        backup_location: None,
                        storage_format: StorageFormat::Delimited,
                        size_bytes: size,
                    })
                }
                (Err(convert_err), Err(backup_err)) => {
                    warn!("Both conversion and preservation failed: {convert_err}; {backup_err}");
                    Err(backup_err)
                }
            }
        }
    }

    /// Validates convertibility through the resolver, converts on the
    /// worker pool, and uploads the columnar artifact.
    async fn convert_and_store(&self, temp: &Path, key: &str) -> Result<BlobRef> {
        let scratch = tempfile::Builder::new()
            .suffix(".parquet")
            .tempfile()
            .map_err(|err| IngestError::Conversion(format!("creating scratch file: {err}")))?;
        let dest: PathBuf = scratch.path().to_path_buf();
        let source = temp.to_path_buf();
        let resolver = self.resolver.clone();

        let rows = self
            .pool
            .run_blocking(move || -> Result<u64> {
                let resolution = resolver.resolve(&source)?;
                convert_to_parquet(&source, &resolution, &dest)
            })
            .await??;
        debug!("Columnar conversion wrote {rows} row(s)");

        self.blobs.put(key, scratch.path()).await
    }
}

fn file_stem(filename: &str) -> String {
    Path::new(filename)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .filter(|stem| !stem.is_empty())
        .unwrap_or("data")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_stem_strips_extension_and_tolerates_odd_names() {
        assert_eq!(file_stem("sales.csv"), "sales");
        assert_eq!(file_stem("archive.tar.gz"), "archive.tar");
        assert_eq!(file_stem(""), "data");
    }
}
