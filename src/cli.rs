use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(author, version, about = "Resolve, convert, and ingest tabular datasets", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Resolve a parsing strategy for a file and print its columns
    Probe(ProbeArgs),
    /// Convert a delimited file to ZSTD-compressed Parquet
    Convert(ConvertArgs),
    /// Run the full ingestion pipeline against a local blob directory
    Ingest(IngestArgs),
}

#[derive(Debug, Args)]
pub struct ProbeArgs {
    /// Input file to inspect
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Also count every data row with the chosen strategy
    #[arg(long)]
    pub count: bool,
    /// Character encoding of the input file (defaults to BOM sniffing)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Args)]
pub struct ConvertArgs {
    /// Input delimited file
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Output Parquet file
    #[arg(short = 'o', long = "output")]
    pub output: PathBuf,
}

#[derive(Debug, Args)]
pub struct IngestArgs {
    /// Input file to ingest
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Directory backing the local object store
    #[arg(long)]
    pub store: PathBuf,
    /// Owner recorded on the dataset
    #[arg(long, default_value = "local")]
    pub owner: String,
    /// Large-file threshold in bytes; uploads at or above it skip the
    /// backup copy
    #[arg(long)]
    pub threshold: Option<u64>,
    /// Number of concurrent workers for blocking conversion and analysis
    #[arg(long, default_value_t = crate::worker::DEFAULT_WORKERS)]
    pub workers: usize,
}
