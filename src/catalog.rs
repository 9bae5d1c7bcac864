//! Dataset records, lifecycle states, spreadsheet state, and the metadata
//! store boundary.
//!
//! The store is a table of [`DatasetRecord`]s keyed by id, queryable by
//! id + owner, with atomic partial updates and newest-first listing. The
//! in-memory [`MemoryCatalog`] ships for local operation and tests; a
//! hosted relational backend implements the same trait.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    blob::BlobRef,
    error::{IngestError, Result},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageFormat {
    /// The original delimited upload.
    Delimited,
    /// Compressed columnar conversion.
    Columnar,
}

/// Lifecycle: `Uploading → Processing → Ready | Error`. Nothing leaves a
/// terminal state except record deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetStatus {
    Uploading,
    Processing,
    Ready,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetRecord {
    pub id: Uuid,
    pub owner: String,
    pub filename: String,
    pub location: BlobRef,
    /// Preserved original copy, present when the pipeline took the
    /// parallel backup path. Deleted together with the record.
    pub backup_location: Option<BlobRef>,
    pub storage_format: StorageFormat,
    pub size_bytes: u64,
    pub row_count: u64,
    pub column_count: usize,
    pub columns: Vec<String>,
    /// True when the stored count derives from a sampled prefix instead of
    /// a full read.
    pub row_count_estimated: bool,
    pub status: DatasetStatus,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Arbitrary spreadsheet state (cell edits, formulas, formatting, column
/// widths) persisted per dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpreadsheetState {
    pub data: serde_json::Value,
    pub updated_at: DateTime<Utc>,
}

#[async_trait]
pub trait DatasetCatalog: Send + Sync {
    async fn insert(&self, record: DatasetRecord) -> Result<()>;

    /// Fetches a record, verifying ownership. A record owned by someone
    /// else is indistinguishable from a missing one.
    async fn get(&self, id: Uuid, owner: &str) -> Result<DatasetRecord>;

    /// All of `owner`'s records, newest first.
    async fn list(&self, owner: &str) -> Result<Vec<DatasetRecord>>;

    /// The analyzer's single atomic terminal update: counts, columns, and
    /// `Ready` status land together or not at all.
    async fn mark_ready(
        &self,
        id: Uuid,
        owner: &str,
        columns: Vec<String>,
        row_count: u64,
        estimated: bool,
    ) -> Result<()>;

    /// Terminal error update, scoped by id alone so a failed analysis can
    /// always land its message.
    async fn mark_error(&self, id: Uuid, message: &str) -> Result<()>;

    /// Removes the record. Blob deletion is the caller's responsibility and
    /// must happen first.
    async fn delete(&self, id: Uuid, owner: &str) -> Result<()>;

    async fn save_state(&self, id: Uuid, owner: &str, data: serde_json::Value) -> Result<SpreadsheetState>;
    async fn load_state(&self, id: Uuid, owner: &str) -> Result<Option<SpreadsheetState>>;
    async fn clear_state(&self, id: Uuid, owner: &str) -> Result<()>;
}

/// In-memory catalog guarded by an async lock.
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    records: RwLock<HashMap<Uuid, DatasetRecord>>,
    states: RwLock<HashMap<Uuid, SpreadsheetState>>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ownership check shared by the state operations.
    async fn verify_owner(&self, id: Uuid, owner: &str) -> Result<()> {
        let records = self.records.read().await;
        match records.get(&id) {
            Some(record) if record.owner == owner => Ok(()),
            _ => Err(IngestError::NotFound),
        }
    }
}

#[async_trait]
impl DatasetCatalog for MemoryCatalog {
    async fn insert(&self, record: DatasetRecord) -> Result<()> {
        let mut records = self.records.write().await;
        records.insert(record.id, record);
        Ok(())
    }

    async fn get(&self, id: Uuid, owner: &str) -> Result<DatasetRecord> {
        let records = self.records.read().await;
        match records.get(&id) {
            Some(record) if record.owner == owner => Ok(record.clone()),
            _ => Err(IngestError::NotFound),
        }
    }

    async fn list(&self, owner: &str) -> Result<Vec<DatasetRecord>> {
        let records = self.records.read().await;
        let mut out: Vec<DatasetRecord> = records
            .values()
            .filter(|record| record.owner == owner)
            .cloned()
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(out)
    }

    async fn mark_ready(
        &self,
        id: Uuid,
        owner: &str,
        columns: Vec<String>,
        row_count: u64,
        estimated: bool,
    ) -> Result<()> {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(&id)
            .filter(|record| record.owner == owner)
            .ok_or_else(|| {
                IngestError::MetadataWrite(format!("dataset {id} not found for ready update"))
            })?;
        record.column_count = columns.len();
        record.columns = columns;
        record.row_count = row_count;
        record.row_count_estimated = estimated;
        record.status = DatasetStatus::Ready;
        record.error_message = None;
        record.updated_at = Utc::now();
        Ok(())
    }

    async fn mark_error(&self, id: Uuid, message: &str) -> Result<()> {
        let mut records = self.records.write().await;
        let record = records.get_mut(&id).ok_or_else(|| {
            IngestError::MetadataWrite(format!("dataset {id} not found for error update"))
        })?;
        record.status = DatasetStatus::Error;
        record.error_message = Some(message.to_string());
        record.updated_at = Utc::now();
        Ok(())
    }

    async fn delete(&self, id: Uuid, owner: &str) -> Result<()> {
        let mut records = self.records.write().await;
        match records.get(&id) {
            Some(record) if record.owner == owner => {
                records.remove(&id);
                self.states.write().await.remove(&id);
                Ok(())
            }
            _ => Err(IngestError::NotFound),
        }
    }

    async fn save_state(
        &self,
        id: Uuid,
        owner: &str,
        data: serde_json::Value,
    ) -> Result<SpreadsheetState> {
        self.verify_owner(id, owner).await?;
        let state = SpreadsheetState {
            data,
            updated_at: Utc::now(),
        };
        self.states.write().await.insert(id, state.clone());
        Ok(state)
    }

    async fn load_state(&self, id: Uuid, owner: &str) -> Result<Option<SpreadsheetState>> {
        self.verify_owner(id, owner).await?;
        Ok(self.states.read().await.get(&id).cloned())
    }

    async fn clear_state(&self, id: Uuid, owner: &str) -> Result<()> {
        self.verify_owner(id, owner).await?;
        self.states.write().await.remove(&id);
        Ok(())
    }
}
