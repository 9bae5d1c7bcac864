pub mod analyze;
pub mod blob;
pub mod catalog;
pub mod cli;
pub mod convert;
pub mod dataset;
pub mod engine;
pub mod error;
pub mod pipeline;
pub mod query;
pub mod resolve;
pub mod sanitize;
pub mod strategy;
pub mod worker;

use std::{env, sync::Arc, sync::OnceLock};

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, LevelFilter};

use crate::{
    analyze::Analyzer,
    blob::FsBlobStore,
    catalog::MemoryCatalog,
    cli::{Cli, Commands},
    dataset::DatasetService,
    engine::LocalEngine,
    pipeline::{Pipeline, PipelineConfig},
    resolve::Resolver,
    worker::WorkerPool,
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("datadock", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Probe(args) => handle_probe(&args),
        Commands::Convert(args) => handle_convert(&args),
        Commands::Ingest(args) => handle_ingest(&args),
    }
}

fn handle_probe(args: &cli::ProbeArgs) -> Result<()> {
    info!("Probing '{}'", args.input.display());
    let engine = match args.input_encoding.as_deref() {
        Some(label) => LocalEngine::with_encoding(label)?,
        None => LocalEngine::new(),
    };
    let resolver = Resolver::new(Arc::new(engine));
    let resolution = resolver
        .resolve(&args.input)
        .with_context(|| format!("Resolving {:?}", args.input))?;

    println!("strategy: {}", resolution.strategy.name);
    println!("delimiter: {:?}", resolution.delimiter as char);
    println!("columns ({}):", resolution.columns.len());
    for (idx, name) in resolution.columns.iter().enumerate() {
        if resolution.raw_columns[idx] != *name {
            println!("  {idx}: {name} (was {:?})", resolution.raw_columns[idx]);
        } else {
            println!("  {idx}: {name}");
        }
    }
    println!("sample rows: {}", resolution.sample.len());

    if args.count {
        let count = resolver.count_or_estimate(&args.input, &resolution);
        println!(
            "row count: {}{}",
            count.rows,
            if count.estimated { " (estimated)" } else { "" }
        );
    }
    Ok(())
}

fn handle_convert(args: &cli::ConvertArgs) -> Result<()> {
    info!(
        "Converting '{}' -> '{}'",
        args.input.display(),
        args.output.display()
    );
    let resolver = Resolver::new(Arc::new(LocalEngine::new()));
    let resolution = resolver
        .resolve(&args.input)
        .with_context(|| format!("Resolving {:?}", args.input))?;
    let rows = convert::convert_to_parquet(&args.input, &resolution, &args.output)
        .with_context(|| format!("Converting {:?}", args.input))?;
    info!(
        "Wrote {rows} row(s) across {} column(s) to {:?}",
        resolution.columns.len(),
        args.output
    );
    Ok(())
}

fn handle_ingest(args: &cli::IngestArgs) -> Result<()> {
    let runtime = tokio::runtime::Runtime::new().context("Starting async runtime")?;
    runtime.block_on(ingest_locally(args))
}

async fn ingest_locally(args: &cli::IngestArgs) -> Result<()> {
    let engine = Arc::new(LocalEngine::new());
    let resolver = Resolver::new(engine);
    let blobs = Arc::new(FsBlobStore::new(&args.store));
    let catalog = Arc::new(MemoryCatalog::new());
    let pool = WorkerPool::new(args.workers);

    let mut config = PipelineConfig::default();
    if let Some(threshold) = args.threshold {
        config.large_file_threshold = threshold;
    }

    let pipeline = Pipeline::new(resolver.clone(), blobs.clone(), pool.clone(), config);
    let analyzer = Arc::new(Analyzer::new(
        resolver,
        blobs.clone(),
        catalog.clone(),
        pool.clone(),
    ));
    let service = DatasetService::new(pipeline, analyzer, catalog.clone(), blobs);

    let filename = args
        .input
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("upload.csv")
        .to_string();
    let body = tokio::fs::File::open(&args.input)
        .await
        .with_context(|| format!("Opening input file {:?}", args.input))?;
    let record = service
        .upload(body, &filename, &args.owner)
        .await
        .with_context(|| format!("Ingesting {:?}", args.input))?;

    // Drain the background analysis before reporting the terminal record.
    pool.shutdown().await;

    let terminal = service.get(record.id, &args.owner).await?;
    println!("{}", serde_json::to_string_pretty(&terminal)?);
    Ok(())
}
