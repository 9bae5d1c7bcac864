//! Dataset service: the operations an outer transport layer calls.
//!
//! Upload streams the body to a local temp copy, runs the pipeline, inserts
//! the metadata record, and schedules background analysis — the caller gets
//! its response as soon as the bytes are durable and the record exists.
//! Everything after that surfaces through the record's status on later
//! reads. Deletion removes every referenced blob before the record so no
//! storage is orphaned.

use std::sync::Arc;

use chrono::Utc;
use log::info;
use tokio::io::{AsyncRead, AsyncWriteExt};
use uuid::Uuid;

use crate::{
    analyze::Analyzer,
    blob::BlobStore,
    catalog::{DatasetCatalog, DatasetRecord, DatasetStatus, SpreadsheetState},
    error::Result,
    pipeline::Pipeline,
};

pub struct DatasetService {
    pipeline: Pipeline,
    analyzer: Arc<Analyzer>,
    catalog: Arc<dyn DatasetCatalog>,
    blobs: Arc<dyn BlobStore>,
}

impl DatasetService {
    pub fn new(
        pipeline: Pipeline,
        analyzer: Arc<Analyzer>,
        catalog: Arc<dyn DatasetCatalog>,
        blobs: Arc<dyn BlobStore>,
    ) -> Self {
        Self {
            pipeline,
            analyzer,
            catalog,
            blobs,
        }
    }

    /// Accepts an upload. Returns once the bytes are durably stored and the
    /// record exists in `Processing` status; analysis completes in the
    /// background. Errors out of this method mean the upload was never
    /// accepted.
    pub async fn upload<R>(&self, mut body: R, filename: &str, owner: &str) -> Result<DatasetRecord>
    where
        R: AsyncRead + Unpin + Send,
    {
        let id = Uuid::new_v4();
        let scratch = tempfile::Builder::new().suffix(".upload").tempfile()?;
        let temp_path = scratch.path().to_path_buf();

        let mut out = tokio::fs::File::create(&temp_path).await?;
        let size = tokio::io::copy(&mut body, &mut out).await?;
        out.flush().await?;
        drop(out);
        info!("Received '{filename}' ({size} bytes) from {owner} as dataset {id}");

        let outcome = self.pipeline.ingest(id, &temp_path, filename, size).await?;

        let now = Utc::now();
        let record = DatasetRecord {
            id,
            owner: owner.to_string(),
            filename: filename.to_string(),
            location: outcome.location,
            backup_location: outcome.backup_location,
            storage_format: outcome.storage_format,
            size_bytes: outcome.size_bytes,
            row_count: 0,
            column_count: 0,
            columns: Vec::new(),
            row_count_estimated: false,
            status: DatasetStatus::Processing,
            error_message: None,
            created_at: now,
            updated_at: now,
        };
        self.catalog.insert(record.clone()).await?;

        // Record creation happens-before analysis scheduling.
        self.analyzer.spawn(id, owner.to_string()).await;

        Ok(record)
    }

    pub async fn get(&self, id: Uuid, owner: &str) -> Result<DatasetRecord> {
        self.catalog.get(id, owner).await
    }

    pub async fn list(&self, owner: &str) -> Result<Vec<DatasetRecord>> {
        self.catalog.list(owner).await
    }

    /// Deletes the dataset's blobs, then its record. A failed blob delete
    /// aborts the operation with the record intact.
    pub async fn delete(&self, id: Uuid, owner: &str) -> Result<()> {
        let record = self.catalog.get(id, owner).await?;
        self.blobs.delete(&record.location).await?;
        if let Some(backup) = &record.backup_location {
            self.blobs.delete(backup).await?;
        }
        self.catalog.delete(id, owner).await?;
        info!("Deleted dataset {id}");
        Ok(())
    }

    pub async fn save_state(
        &self,
        id: Uuid,
        owner: &str,
        data: serde_json::Value,
    ) -> Result<SpreadsheetState> {
        self.catalog.save_state(id, owner, data).await
    }

    pub async fn load_state(&self, id: Uuid, owner: &str) -> Result<Option<SpreadsheetState>> {
        self.catalog.load_state(id, owner).await
    }

    pub async fn clear_state(&self, id: Uuid, owner: &str) -> Result<()> {
        self.catalog.clear_state(id, owner).await
    }

    /// Direct handle for callers that need to await analysis (tests, the
    /// CLI) instead of polling the record.
    pub fn analyzer(&self) -> &Arc<Analyzer> {
        &self.analyzer
    }
}
