//! Ingestion resolution: pick the first catalog strategy that yields a
//! usable sample, sanitize its columns, and expose full-file row counting
//! with an estimate fallback.

use std::{fs, path::Path, sync::Arc};

use log::{debug, info, warn};

use crate::{
    engine::TableEngine,
    error::{FailureHint, IngestError, Result},
    sanitize::sanitize_columns,
    strategy::{catalog, DelimiterSpec, ParseStrategy},
};

/// Rows read per strategy attempt. Small on purpose: resolution decides
/// parseability, analysis handles the full file.
pub const SAMPLE_ROWS: usize = 10;

/// Bytes of the source sampled when estimating a row count.
const ESTIMATE_PREFIX_BYTES: u64 = 100_000;

/// Outcome of a successful resolution. Ephemeral: callers persist only the
/// derived fields (columns, column count), never the resolution itself.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub strategy: ParseStrategy,
    /// Concrete delimiter, after any sniffing the engine performed.
    pub delimiter: u8,
    /// Sanitized, unique, query-safe column names.
    pub columns: Vec<String>,
    /// Column names exactly as they appeared in the source.
    pub raw_columns: Vec<String>,
    pub sample: Vec<Vec<Option<String>>>,
}

impl Resolution {
    /// The chosen strategy with its delimiter pinned, so downstream reads
    /// (counting, conversion) use the identical configuration instead of
    /// re-sniffing.
    pub fn pinned_strategy(&self) -> ParseStrategy {
        let mut strategy = self.strategy;
        strategy.delimiter = DelimiterSpec::Byte(self.delimiter);
        strategy
    }
}

/// A row count, exact or derived from a sampled prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowCount {
    pub rows: u64,
    pub estimated: bool,
}

/// Tries the strategy catalog in order against a source.
#[derive(Clone)]
pub struct Resolver {
    engine: Arc<dyn TableEngine>,
}

impl Resolver {
    pub fn new(engine: Arc<dyn TableEngine>) -> Self {
        Self { engine }
    }

    /// Resolves a parsing strategy for `source`.
    ///
    /// A strategy succeeds iff its sample has at least one column, at least
    /// one row, and at least one non-null cell; an all-null sample means a
    /// wrong delimiter produced a degenerate split and is rejected. The
    /// first success wins and no further strategies are tried.
    pub fn resolve(&self, source: &Path) -> Result<Resolution> {
        let mut failures: Vec<(&'static str, String)> = Vec::new();

        for strategy in catalog() {
            debug!("Trying parsing strategy '{}'", strategy.name);
            let sample = match self.engine.sample(source, strategy, SAMPLE_ROWS) {
                Ok(sample) => sample,
                Err(err) => {
                    warn!("Strategy '{}' failed: {err:#}", strategy.name);
                    failures.push((strategy.name, format!("{err:#}")));
                    continue;
                }
            };

            if sample.columns.is_empty() || sample.rows.is_empty() {
                debug!(
                    "Strategy '{}' returned no columns or rows",
                    strategy.name
                );
                failures.push((strategy.name, "no columns or rows".to_string()));
                continue;
            }
            if sample.non_null_cells() == 0 {
                warn!("Strategy '{}' returned an all-null sample", strategy.name);
                failures.push((strategy.name, "all-null sample".to_string()));
                continue;
            }

            let columns = sanitize_columns(&sample.columns);
            if columns != sample.columns {
                warn!(
                    "Column names were sanitized; originals were {:?}",
                    sample.columns
                );
            }
            info!(
                "Strategy '{}' succeeded: {} column(s), {} sample row(s)",
                strategy.name,
                columns.len(),
                sample.rows.len()
            );
            return Ok(Resolution {
                strategy: *strategy,
                delimiter: sample.delimiter,
                columns,
                raw_columns: sample.columns,
                sample: sample.rows,
            });
        }

        Err(IngestError::Resolution {
            hint: guess_hint(&failures),
        })
    }

    /// Exact row count using the resolution's pinned configuration.
    pub fn count_rows(&self, source: &Path, resolution: &Resolution) -> Result<u64> {
        self.engine
            .count_rows(source, &resolution.pinned_strategy())
            .map_err(|err| IngestError::Count {
                strategy: resolution.strategy.name,
                message: format!("{err:#}"),
            })
    }

    /// Exact count, falling back to a byte-ratio estimate when the full
    /// read fails for a reason the sample read did not hit. The estimate is
    /// always labeled as such.
    pub fn count_or_estimate(&self, source: &Path, resolution: &Resolution) -> RowCount {
        match self.count_rows(source, resolution) {
            Ok(rows) => RowCount {
                rows,
                estimated: false,
            },
            Err(err) => {
                warn!("Exact row count failed, estimating from prefix: {err}");
                let rows = estimate_row_count(source, resolution.strategy.has_headers)
                    .unwrap_or(resolution.sample.len() as u64);
                RowCount {
                    rows,
                    estimated: true,
                }
            }
        }
    }
}

/// Scales the newline count of a bounded prefix by the file size.
pub fn estimate_row_count(source: &Path, has_headers: bool) -> std::io::Result<u64> {
    let size = fs::metadata(source)?.len();
    if size == 0 {
        return Ok(0);
    }
    let take = size.min(ESTIMATE_PREFIX_BYTES);
    let mut prefix = vec![0u8; take as usize];
    {
        use std::io::Read;
        let mut file = fs::File::open(source)?;
        file.read_exact(&mut prefix)?;
    }
    let lines = prefix.iter().filter(|&&b| b == b'\n').count() as u64;
    if lines == 0 {
        return Ok(0);
    }
    let mut estimate = lines.saturating_mul(size) / take;
    if has_headers {
        estimate = estimate.saturating_sub(1);
    }
    Ok(estimate)
}

/// Picks the most likely cause out of the per-strategy failure reasons.
/// Falls back to the delimiter hint: an unrecognized delimiter is by far
/// the most common way every strategy fails.
fn guess_hint(failures: &[(&'static str, String)]) -> FailureHint {
    for (_, reason) in failures {
        let lowered = reason.to_ascii_lowercase();
        if lowered.contains("quote") || lowered.contains("escape") {
            return FailureHint::Quoting;
        }
        if lowered.contains("encod") || lowered.contains("utf") {
            return FailureHint::Encoding;
        }
        if lowered.contains("header") {
            return FailureHint::Header;
        }
    }
    FailureHint::Delimiter
}
