//! Streaming conversion of a resolved delimited source into compressed
//! Parquet.
//!
//! The source is read in bounded-size record batches — the whole file is
//! never materialized — and written incrementally. The writer's schema is
//! fixed from the resolution before the first batch; a batch that does not
//! conform is a conversion failure, never a silent widening.

use std::{
    fs::File,
    io::{BufReader, Read},
    path::Path,
    sync::Arc,
};

use arrow::csv::{reader::Format, ReaderBuilder};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use encoding_rs_io::DecodeReaderBytesBuilder;
use log::info;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, ZstdLevel};
use parquet::file::properties::WriterProperties;

use crate::{
    error::{IngestError, Result},
    resolve::Resolution,
    strategy::{ParseStrategy, TypeInference},
};

/// Rows per record batch; bounds memory independent of file size.
pub const BATCH_ROWS: usize = 8192;

/// Converts `source` to ZSTD-compressed Parquet at `dest` using the
/// resolution's pinned configuration, returning the number of rows written.
/// Output columns carry the resolution's sanitized names.
pub fn convert_to_parquet(source: &Path, resolution: &Resolution, dest: &Path) -> Result<u64> {
    let strategy = resolution.pinned_strategy();
    let schema = build_schema(source, resolution, &strategy)?;

    let reader = ReaderBuilder::new(schema.clone())
        .with_header(strategy.has_headers)
        .with_delimiter(resolution.delimiter)
        .with_quote(strategy.quote)
        .with_batch_size(BATCH_ROWS)
        .with_truncated_rows(true)
        .build(open_source(source, &strategy)?)
        .map_err(|err| IngestError::Conversion(err.to_string()))?;

    let props = WriterProperties::builder()
        .set_compression(Compression::ZSTD(ZstdLevel::default()))
        .build();
    let out = File::create(dest)?;
    let mut writer = ArrowWriter::try_new(out, schema, Some(props))
        .map_err(|err| IngestError::Conversion(err.to_string()))?;

    let mut rows = 0u64;
    for batch in reader {
        let batch =
            batch.map_err(|err| IngestError::Conversion(format!("block rejected: {err}")))?;
        rows += batch.num_rows() as u64;
        writer
            .write(&batch)
            .map_err(|err| IngestError::Conversion(err.to_string()))?;
    }
    writer
        .close()
        .map_err(|err| IngestError::Conversion(err.to_string()))?;

    info!(
        "Converted {:?} to columnar format: {rows} row(s), {} column(s)",
        source,
        resolution.columns.len()
    );
    Ok(rows)
}

/// Column names and exact row count of a Parquet file, straight from the
/// footer metadata — no data pages are read.
pub fn read_parquet_summary(path: &Path) -> Result<(Vec<String>, u64)> {
    let file = File::open(path)?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .map_err(|err| IngestError::Conversion(err.to_string()))?;
    let rows = builder.metadata().file_metadata().num_rows().max(0) as u64;
    let columns = builder
        .schema()
        .fields()
        .iter()
        .map(|field| field.name().clone())
        .collect();
    Ok((columns, rows))
}

/// Fixes the output schema up front. All-text strategies map every column
/// to nullable Utf8; the typed strategy infers types over its sample window
/// and keeps them for the whole file. Field names always come from the
/// resolution's sanitized columns.
fn build_schema(
    source: &Path,
    resolution: &Resolution,
    strategy: &ParseStrategy,
) -> Result<SchemaRef> {
    let fields: Vec<Field> = match strategy.inference {
        TypeInference::AllText => resolution
            .columns
            .iter()
            .map(|name| Field::new(name, DataType::Utf8, true))
            .collect(),
        TypeInference::Typed => {
            let format = Format::default()
                .with_header(strategy.has_headers)
                .with_delimiter(resolution.delimiter)
                .with_quote(strategy.quote)
                .with_truncated_rows(true);
            let (inferred, _) = format
                .infer_schema(
                    open_source(source, strategy)?,
                    Some(strategy.sample_rows),
                )
                .map_err(|err| IngestError::Conversion(err.to_string()))?;
            if inferred.fields().len() != resolution.columns.len() {
                return Err(IngestError::Conversion(format!(
                    "inferred {} column(s) but resolution produced {}",
                    inferred.fields().len(),
                    resolution.columns.len()
                )));
            }
            inferred
                .fields()
                .iter()
                .zip(&resolution.columns)
                .map(|(field, name)| Field::new(name, field.data_type().clone(), true))
                .collect()
        }
    };
    Ok(Arc::new(Schema::new(fields)))
}

fn open_source(source: &Path, strategy: &ParseStrategy) -> Result<Box<dyn Read>> {
    let file = File::open(source)?;
    let buffered = BufReader::new(file);
    let reader: Box<dyn Read> = if strategy.lossy_decoding {
        Box::new(DecodeReaderBytesBuilder::new().build(buffered))
    } else {
        Box::new(buffered)
    };
    Ok(reader)
}
