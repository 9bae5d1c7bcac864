//! Structured error taxonomy for the ingestion core.
//!
//! Failures inside the resolver, pipeline, and analyzer are converted into
//! terminal dataset states rather than propagated as process errors; the
//! variants here carry enough structure to produce a sanitized user-facing
//! message without leaking low-level error text.

use thiserror::Error;

pub type Result<T, E = IngestError> = std::result::Result<T, E>;

/// Best-guess cause when no parsing strategy produced a usable sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureHint {
    Delimiter,
    Quoting,
    Encoding,
    Header,
}

impl FailureHint {
    /// User-facing guidance for the hint. Never includes raw error text.
    pub fn user_message(&self) -> &'static str {
        match self {
            FailureHint::Delimiter => {
                "Could not parse the file. Please ensure it is a delimited text \
                 file using comma, tab, semicolon, or pipe as the delimiter, \
                 with at least one column of data."
            }
            FailureHint::Quoting => {
                "Quote or escape characters were not recognized. Please use \
                 standard double-quotes (\") around text fields."
            }
            FailureHint::Encoding => {
                "The file encoding is not supported. Please save the file as \
                 UTF-8 and upload it again."
            }
            FailureHint::Header => {
                "Could not detect column headers. Please ensure the first row \
                 contains column names."
            }
        }
    }
}

impl std::fmt::Display for FailureHint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            FailureHint::Delimiter => "delimiter not recognized",
            FailureHint::Quoting => "quoting convention not recognized",
            FailureHint::Encoding => "encoding unsupported",
            FailureHint::Header => "header row not detected",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Error)]
pub enum IngestError {
    /// No strategy in the catalog produced a usable sample.
    #[error("could not resolve a parsing strategy: {hint}")]
    Resolution { hint: FailureHint },

    /// The columnar writer rejected a block or errored outright.
    #[error("columnar conversion failed: {0}")]
    Conversion(String),

    /// Exact row count could not be obtained with the chosen strategy.
    #[error("row count failed using strategy '{strategy}': {message}")]
    Count {
        strategy: &'static str,
        message: String,
    },

    /// A terminal metadata update failed. Not retried automatically.
    #[error("metadata update failed: {0}")]
    MetadataWrite(String),

    #[error("object store operation failed: {0}")]
    Blob(String),

    #[error("dataset not found")]
    NotFound,

    #[error("worker pool is shut down")]
    PoolClosed,

    #[error("background task failed: {0}")]
    Task(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl IngestError {
    /// Message safe to surface on a dataset record. Structural failures map
    /// to their guidance text; transport failures get a generic line so raw
    /// error strings never reach the client.
    pub fn user_message(&self) -> String {
        match self {
            IngestError::Resolution { hint } => hint.user_message().to_string(),
            IngestError::Conversion(_) => {
                "The file could not be converted for analysis. It was kept in \
                 its original format."
                    .to_string()
            }
            IngestError::Count { .. } => {
                "The exact row count could not be determined.".to_string()
            }
            IngestError::NotFound => "Dataset not found.".to_string(),
            _ => "Processing failed due to an internal error. Please try \
                  uploading the file again."
                .to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_messages_never_leak_internal_text() {
        let err = IngestError::Blob("connection reset by peer at 10.0.0.3:9000".to_string());
        assert!(!err.user_message().contains("10.0.0.3"));

        let err = IngestError::Conversion("schema mismatch in block 17".to_string());
        assert!(!err.user_message().contains("block 17"));
    }

    #[test]
    fn resolution_hint_controls_guidance() {
        let err = IngestError::Resolution {
            hint: FailureHint::Encoding,
        };
        assert!(err.user_message().contains("UTF-8"));
    }
}
