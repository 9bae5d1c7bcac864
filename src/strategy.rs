//! The ordered catalog of parsing strategies.
//!
//! Each strategy is a typed configuration handed to a [`TableEngine`]
//! implementation — never a formatted command string. The catalog is tried
//! top to bottom and the first strategy that yields a usable sample wins.
//! Comma is the dominant convention, so the generic auto-detect entries run
//! before any forced delimiter.
//!
//! [`TableEngine`]: crate::engine::TableEngine

/// How the delimiter is chosen for a strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelimiterSpec {
    /// Sniff the delimiter from a sample of the source.
    Auto,
    /// Use exactly this byte.
    Byte(u8),
}

/// Whether column types are inferred or everything is read as text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeInference {
    Typed,
    AllText,
}

/// A single parsing configuration. Ephemeral: tried, possibly chosen,
/// discarded after resolution.
#[derive(Debug, Clone, Copy)]
pub struct ParseStrategy {
    pub name: &'static str,
    pub delimiter: DelimiterSpec,
    pub has_headers: bool,
    /// Quote byte for field escaping; every catalog entry uses the
    /// double-quote convention with doubled-quote escapes.
    pub quote: u8,
    /// Decode the source leniently, replacing undecodable bytes instead of
    /// rejecting the file.
    pub lossy_decoding: bool,
    /// Rows examined for delimiter sniffing and type inference.
    pub sample_rows: usize,
    pub inference: TypeInference,
    /// Records longer than this are treated as malformed and skipped, so a
    /// single runaway line cannot reject a file with very wide text fields.
    pub max_record_bytes: usize,
}

const MAX_RECORD_BYTES: usize = 100_000_000;

static CATALOG: [ParseStrategy; 7] = [
    ParseStrategy {
        name: "auto_detect_large_sample",
        delimiter: DelimiterSpec::Auto,
        has_headers: true,
        quote: b'"',
        lossy_decoding: true,
        sample_rows: 20_000,
        inference: TypeInference::Typed,
        max_record_bytes: MAX_RECORD_BYTES,
    },
    ParseStrategy {
        name: "auto_detect_all_text",
        delimiter: DelimiterSpec::Auto,
        has_headers: true,
        quote: b'"',
        lossy_decoding: true,
        sample_rows: 10_000,
        inference: TypeInference::AllText,
        max_record_bytes: MAX_RECORD_BYTES,
    },
    ParseStrategy {
        name: "comma_delimiter",
        delimiter: DelimiterSpec::Byte(b','),
        has_headers: true,
        quote: b'"',
        lossy_decoding: true,
        sample_rows: 10_000,
        inference: TypeInference::AllText,
        max_record_bytes: MAX_RECORD_BYTES,
    },
    ParseStrategy {
        name: "tab_delimiter",
        delimiter: DelimiterSpec::Byte(b'\t'),
        has_headers: true,
        quote: b'"',
        lossy_decoding: true,
        sample_rows: 10_000,
        inference: TypeInference::AllText,
        max_record_bytes: MAX_RECORD_BYTES,
    },
    // Regional spreadsheet exports commonly use semicolons.
    ParseStrategy {
        name: "semicolon_delimiter",
        delimiter: DelimiterSpec::Byte(b';'),
        has_headers: true,
        quote: b'"',
        lossy_decoding: true,
        sample_rows: 10_000,
        inference: TypeInference::AllText,
        max_record_bytes: MAX_RECORD_BYTES,
    },
    ParseStrategy {
        name: "pipe_delimiter",
        delimiter: DelimiterSpec::Byte(b'|'),
        has_headers: true,
        quote: b'"',
        lossy_decoding: true,
        sample_rows: 10_000,
        inference: TypeInference::AllText,
        max_record_bytes: MAX_RECORD_BYTES,
    },
    ParseStrategy {
        name: "no_header",
        delimiter: DelimiterSpec::Auto,
        has_headers: false,
        quote: b'"',
        lossy_decoding: true,
        sample_rows: 10_000,
        inference: TypeInference::AllText,
        max_record_bytes: MAX_RECORD_BYTES,
    },
];

/// The full catalog in trial order.
pub fn catalog() -> &'static [ParseStrategy] {
    &CATALOG
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_order_tries_auto_detect_first() {
        let names: Vec<&str> = catalog().iter().map(|s| s.name).collect();
        assert_eq!(
            names,
            vec![
                "auto_detect_large_sample",
                "auto_detect_all_text",
                "comma_delimiter",
                "tab_delimiter",
                "semicolon_delimiter",
                "pipe_delimiter",
                "no_header",
            ]
        );
    }

    #[test]
    fn only_the_last_strategy_treats_first_row_as_data() {
        let headerless: Vec<&str> = catalog()
            .iter()
            .filter(|s| !s.has_headers)
            .map(|s| s.name)
            .collect();
        assert_eq!(headerless, vec!["no_header"]);
    }

    #[test]
    fn every_strategy_is_lenient() {
        for strategy in catalog() {
            assert!(strategy.lossy_decoding, "{} must decode leniently", strategy.name);
            assert!(strategy.max_record_bytes >= 1_000_000);
            assert_eq!(strategy.quote, b'"');
        }
    }

    #[test]
    fn only_the_first_strategy_infers_types() {
        let typed: Vec<&str> = catalog()
            .iter()
            .filter(|s| s.inference == TypeInference::Typed)
            .map(|s| s.name)
            .collect();
        assert_eq!(typed, vec!["auto_detect_large_sample"]);
    }
}
