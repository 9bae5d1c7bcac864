//! Background analysis: learn a dataset's schema and row count from its
//! durable location and drive the record to a terminal state.
//!
//! Failures never escape the background task boundary — every structural
//! failure becomes `status = error` with a sanitized message. If the
//! terminal write itself fails, the record keeps its prior status; that
//! inconsistency is logged for operators, not retried automatically.

use std::sync::Arc;

use log::{error, info, warn};
use uuid::Uuid;

use crate::{
    blob::BlobStore,
    catalog::{DatasetCatalog, StorageFormat},
    convert::read_parquet_summary,
    error::Result,
    resolve::{Resolver, RowCount},
    worker::WorkerPool,
};

#[derive(Clone)]
pub struct Analyzer {
    resolver: Resolver,
    blobs: Arc<dyn BlobStore>,
    catalog: Arc<dyn DatasetCatalog>,
    pool: Arc<WorkerPool>,
}

impl Analyzer {
    pub fn new(
        resolver: Resolver,
        blobs: Arc<dyn BlobStore>,
        catalog: Arc<dyn DatasetCatalog>,
        pool: Arc<WorkerPool>,
    ) -> Self {
        Self {
            resolver,
            blobs,
            catalog,
            pool,
        }
    }

    /// Runs one full analysis and writes the terminal state. Idempotent: a
    /// retried invocation recomputes and overwrites the same terminal
    /// values. The returned error mirrors what was recorded, for callers
    /// that await analysis directly.
    pub async fn analyze(&self, id: Uuid, owner: &str) -> Result<()> {
        info!("Starting analysis for dataset {id}");
        match self.inspect(id, owner).await {
            Ok((columns, count)) => {
                let column_count = columns.len();
                self.catalog
                    .mark_ready(id, owner, columns, count.rows, count.estimated)
                    .await
                    .map_err(|err| {
                        error!("Recording analysis success for {id} failed: {err}");
                        err
                    })?;
                info!(
                    "Dataset {id} analyzed: {} row(s){}, {column_count} column(s)",
                    count.rows,
                    if count.estimated { " (estimated)" } else { "" }
                );
                Ok(())
            }
            Err(err) => {
                warn!("Analysis failed for dataset {id}: {err}");
                let message = err.user_message();
                if let Err(write_err) = self.catalog.mark_error(id, &message).await {
                    error!("Recording analysis failure for {id} failed: {write_err}");
                }
                Err(err)
            }
        }
    }

    /// Submits analysis to the worker pool. The completion contract: the
    /// task writes the terminal state exactly once and never propagates an
    /// error to the submitter.
    pub async fn spawn(&self, id: Uuid, owner: String) {
        let analyzer = self.clone();
        self.pool
            .spawn(async move {
                let _ = analyzer.analyze(id, &owner).await;
            })
            .await;
    }

    /// Schema and row count for the record's durable location. Columnar
    /// datasets answer from the Parquet footer; delimited datasets go
    /// through strategy resolution and a full count with estimate fallback.
    async fn inspect(&self, id: Uuid, owner: &str) -> Result<(Vec<String>, RowCount)> {
        let record = self.catalog.get(id, owner).await?;
        let path = self.blobs.open(&record.location).await?;

        match record.storage_format {
            StorageFormat::Columnar => {
                let (columns, rows) = self
                    .pool
                    .run_blocking(move || read_parquet_summary(&path))
                    .await??;
                Ok((
                    columns,
                    RowCount {
                        rows,
                        estimated: false,
                    },
                ))
            }
            StorageFormat::Delimited => {
                let resolver = self.resolver.clone();
                let out = self
                    .pool
                    .run_blocking(move || -> Result<(Vec<String>, RowCount)> {
                        let resolution = resolver.resolve(&path)?;
                        let count = resolver.count_or_estimate(&path, &resolution);
                        Ok((resolution.columns, count))
                    })
                    .await??;
                Ok(out)
            }
        }
    }
}
