//! Natural-language query boundary.
//!
//! The hosted model that turns a question into a candidate query lives
//! behind [`QueryGenerator`]. Its output is untrusted: callers must
//! re-validate it before execution, exactly as they would a raw client
//! query. This crate only assembles the schema description and sample
//! context the generator is prompted with.

use async_trait::async_trait;

use crate::error::Result;

#[async_trait]
pub trait QueryGenerator: Send + Sync {
    /// Produces a candidate query for `question` over a table named `data`
    /// with the described schema. The result must be treated as untrusted
    /// input.
    async fn generate(&self, question: &str, schema: &str, sample_rows: &str) -> Result<String>;
}

/// One-line schema description handed to the generator.
pub fn schema_description(columns: &[String]) -> String {
    columns.join(", ")
}

/// Renders sample rows as delimited lines, with empty fields for nulls.
pub fn render_sample_rows(sample: &[Vec<Option<String>>]) -> String {
    sample
        .iter()
        .map(|row| {
            row.iter()
                .map(|cell| cell.as_deref().unwrap_or(""))
                .collect::<Vec<_>>()
                .join(",")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// The prompt given to the generator for a question over a dataset.
pub fn question_prompt(question: &str, schema: &str, sample_rows: &str) -> String {
    format!(
        "Convert this question to a query. The table is called 'data' and has \
         these columns:\n{schema}\n\nSample rows:\n{sample_rows}\n\n\
         Question: {question}\n\n\
         Return only the query, no explanation. Only read data, never modify it."
    )
}
