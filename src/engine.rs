//! Analytical engine boundary and the local delimited-text implementation.
//!
//! A [`ParseStrategy`] is exactly an engine's configuration surface: the
//! resolver hands a strategy to an engine and gets back either a bounded
//! tabular sample or an error. [`LocalEngine`] implements the trait over
//! local files with the `csv` crate:
//!
//! - delimiter sniffing for auto-detect strategies (candidate scoring over a
//!   bounded prefix of the file),
//! - BOM-aware transcoding plus lossy per-field decoding for encoding
//!   tolerance,
//! - flexible readers that skip malformed records and pad short rows with
//!   nulls instead of failing.
//!
//! Remote or columnar backends implement the same trait; nothing else in
//! the crate reads delimited sources directly.

use std::{
    fs::File,
    io::{BufReader, Cursor, Read},
    path::Path,
};

use anyhow::{anyhow, Context, Result};
use encoding_rs::Encoding;
use encoding_rs_io::DecodeReaderBytesBuilder;
use log::debug;

use crate::strategy::{DelimiterSpec, ParseStrategy};

/// Bytes of the source examined when sniffing a delimiter.
const SNIFF_BYTES: usize = 64 * 1024;
/// Records examined per delimiter candidate during sniffing.
const SNIFF_ROWS: usize = 32;
/// Candidates in preference order; comma wins ties.
const DELIMITER_CANDIDATES: [u8; 4] = [b',', b'\t', b';', b'|'];
/// Upper bound on malformed records skipped before a read is abandoned.
const MAX_SKIPPED_RECORDS: usize = 1_000_000;

/// A bounded read of tabular data under one strategy.
#[derive(Debug, Clone)]
pub struct TableSample {
    /// Raw column names: the decoded header row, or synthesized positional
    /// names for headerless strategies. Not yet sanitized.
    pub columns: Vec<String>,
    /// Sample rows, padded with `None` to the column count.
    pub rows: Vec<Vec<Option<String>>>,
    /// The concrete delimiter used, after any sniffing.
    pub delimiter: u8,
}

impl TableSample {
    pub fn non_null_cells(&self) -> usize {
        self.rows
            .iter()
            .map(|row| row.iter().filter(|cell| cell.is_some()).count())
            .sum()
    }
}

/// The embedded analytical engine contract consumed by the resolver.
pub trait TableEngine: Send + Sync {
    /// Reads up to `rows` data rows from `source` using `strategy`.
    fn sample(&self, source: &Path, strategy: &ParseStrategy, rows: usize) -> Result<TableSample>;

    /// Counts every data row in `source` using `strategy`.
    fn count_rows(&self, source: &Path, strategy: &ParseStrategy) -> Result<u64>;
}

/// Engine over local files, backed by the `csv` crate.
#[derive(Debug, Default, Clone)]
pub struct LocalEngine {
    encoding: Option<&'static Encoding>,
}

impl LocalEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forces a specific source encoding instead of BOM sniffing, e.g.
    /// `windows-1252` for legacy spreadsheet exports.
    pub fn with_encoding(label: &str) -> Result<Self> {
        let encoding = Encoding::for_label(label.trim().as_bytes())
            .ok_or_else(|| anyhow!("Unknown encoding '{label}'"))?;
        Ok(Self {
            encoding: Some(encoding),
        })
    }

    fn resolve_delimiter(&self, source: &Path, strategy: &ParseStrategy) -> Result<u8> {
        match strategy.delimiter {
            DelimiterSpec::Byte(byte) => Ok(byte),
            DelimiterSpec::Auto => sniff_delimiter(source, strategy, self.encoding),
        }
    }
}

impl TableEngine for LocalEngine {
    fn sample(&self, source: &Path, strategy: &ParseStrategy, rows: usize) -> Result<TableSample> {
        let delimiter = self.resolve_delimiter(source, strategy)?;
        let mut reader = open_reader(source, delimiter, strategy, self.encoding)?;

        let mut columns: Vec<String> = if strategy.has_headers {
            let headers = reader
                .byte_headers()
                .context("Reading header row")?
                .clone();
            headers.iter().map(decode_field).collect()
        } else {
            Vec::new()
        };

        let mut width = columns.len();
        let mut out_rows: Vec<Vec<Option<String>>> = Vec::new();
        let mut skipped = 0usize;
        let mut record = csv::ByteRecord::new();

        while out_rows.len() < rows {
            match reader.read_byte_record(&mut record) {
                Ok(true) => {
                    if record.as_slice().len() > strategy.max_record_bytes {
                        skipped += 1;
                        continue;
                    }
                    if width == 0 {
                        width = record.len();
                    }
                    let mut row: Vec<Option<String>> = Vec::with_capacity(width);
                    for field in record.iter().take(width) {
                        if field.is_empty() {
                            row.push(None);
                        } else {
                            row.push(Some(decode_field(field)));
                        }
                    }
                    // Short rows are padded with nulls rather than rejected.
                    while row.len() < width {
                        row.push(None);
                    }
                    out_rows.push(row);
                }
                Ok(false) => break,
                Err(err) if is_transport(&err) => {
                    return Err(err).context("Reading sample records");
                }
                Err(_) => {
                    skipped += 1;
                    if skipped > MAX_SKIPPED_RECORDS {
                        break;
                    }
                }
            }
        }

        if !strategy.has_headers {
            columns = synthesized_columns(width);
        }
        if skipped > 0 {
            debug!(
                "Skipped {skipped} malformed record(s) sampling {:?}",
                source
            );
        }

        Ok(TableSample {
            columns,
            rows: out_rows,
            delimiter,
        })
    }

    fn count_rows(&self, source: &Path, strategy: &ParseStrategy) -> Result<u64> {
        let delimiter = self.resolve_delimiter(source, strategy)?;
        let mut reader = open_reader(source, delimiter, strategy, self.encoding)?;

        let mut count = 0u64;
        let mut skipped = 0usize;
        let mut record = csv::ByteRecord::new();
        loop {
            match reader.read_byte_record(&mut record) {
                Ok(true) => {
                    if record.as_slice().len() > strategy.max_record_bytes {
                        skipped += 1;
                        continue;
                    }
                    count += 1;
                }
                Ok(false) => break,
                Err(err) if is_transport(&err) => {
                    return Err(err).context("Counting records");
                }
                Err(_) => {
                    skipped += 1;
                    if skipped > MAX_SKIPPED_RECORDS {
                        break;
                    }
                }
            }
        }
        if skipped > 0 {
            debug!("Skipped {skipped} malformed record(s) counting {:?}", source);
        }
        Ok(count)
    }
}

/// Positional names for headerless reads; the sanitizer leaves them intact.
fn synthesized_columns(width: usize) -> Vec<String> {
    (0..width).map(|idx| format!("column_{idx}")).collect()
}

fn decode_field(field: &[u8]) -> String {
    String::from_utf8_lossy(field).into_owned()
}

fn is_transport(err: &csv::Error) -> bool {
    matches!(err.kind(), csv::ErrorKind::Io(_))
}

fn open_reader(
    source: &Path,
    delimiter: u8,
    strategy: &ParseStrategy,
    encoding: Option<&'static Encoding>,
) -> Result<csv::Reader<Box<dyn Read>>> {
    let file =
        File::open(source).with_context(|| format!("Opening input file {source:?}"))?;
    let buffered = BufReader::new(file);
    // BOM-carrying sources (UTF-16 spreadsheet exports in particular) are
    // transcoded to UTF-8; BOM-less bytes pass through untouched unless an
    // explicit encoding was forced, and any remaining undecodable fields
    // fall back to lossy per-field decoding.
    let raw: Box<dyn Read> = if strategy.lossy_decoding || encoding.is_some() {
        Box::new(
            DecodeReaderBytesBuilder::new()
                .encoding(encoding)
                .build(buffered),
        )
    } else {
        Box::new(buffered)
    };

    let mut builder = csv::ReaderBuilder::new();
    builder
        .delimiter(delimiter)
        .has_headers(strategy.has_headers)
        .quote(strategy.quote)
        .double_quote(true)
        .flexible(true);
    Ok(builder.from_reader(raw))
}

/// Scores each candidate delimiter over a bounded prefix: a candidate that
/// splits every sampled line into the same multi-column width beats one
/// with drifting widths, which beats one that never splits at all.
fn sniff_delimiter(
    source: &Path,
    strategy: &ParseStrategy,
    encoding: Option<&'static Encoding>,
) -> Result<u8> {
    let mut prefix = read_prefix(source, SNIFF_BYTES)?;
    let truncated = prefix.len() == SNIFF_BYTES;
    if let Some(encoding) = encoding {
        let (decoded, _, _) = encoding.decode(&prefix);
        prefix = decoded.into_owned().into_bytes();
    }

    let mut best: Option<(u8, u32, usize)> = None;
    for candidate in DELIMITER_CANDIDATES {
        let mut widths: Vec<usize> = Vec::new();
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(candidate)
            .has_headers(false)
            .quote(strategy.quote)
            .double_quote(true)
            .flexible(true)
            .from_reader(Cursor::new(prefix.as_slice()));
        let mut record = csv::ByteRecord::new();
        while widths.len() < SNIFF_ROWS {
            match reader.read_byte_record(&mut record) {
                Ok(true) => widths.push(record.len()),
                Ok(false) => break,
                Err(_) => break,
            }
        }
        // The prefix may cut the final line mid-record.
        if truncated && widths.len() > 1 {
            widths.pop();
        }
        let Some(&first) = widths.first() else {
            continue;
        };
        let consistent = widths.iter().all(|&w| w == first);
        let class = match (first > 1, consistent) {
            (true, true) => 2u32,
            (true, false) => 1,
            _ => 0,
        };
        let replace = match best {
            None => true,
            Some((_, best_class, best_width)) => {
                class > best_class || (class == best_class && first > best_width)
            }
        };
        if replace {
            best = Some((candidate, class, first));
        }
    }

    let chosen = best.map(|(b, _, _)| b).unwrap_or(b',');
    debug!(
        "Sniffed delimiter {:?} for {:?}",
        (chosen as char),
        source
    );
    Ok(chosen)
}

fn read_prefix(source: &Path, limit: usize) -> Result<Vec<u8>> {
    let file =
        File::open(source).with_context(|| format!("Opening input file {source:?}"))?;
    let mut buf = Vec::with_capacity(limit.min(8 * 1024));
    let mut handle = BufReader::new(file).take(limit as u64);
    handle
        .read_to_end(&mut buf)
        .with_context(|| format!("Reading sniff prefix of {source:?}"))?;
    Ok(buf)
}
