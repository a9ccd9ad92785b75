//! Phoenix cache tools
//!
//! `phoenix-cache import` records a results document in the cache,
//! `dump-dsm` prints the data source map and `device-map` resolves device
//! names for one grid/cluster. Results are printed to stdout as JSON.
//! `import --dry-run` only parses the document and prints what would be written.

mod cli;
mod config;
mod logging;

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use phoenix_ingest::{DataSourceMapReader, ImportSummary, ResultsDocument, ResultsImporter};
use phoenix_lock::GuardedCache;
use phoenix_store::{KvStore, RedisKvStore};
use serde::Serialize;
use tokio::io::AsyncReadExt;
use tracing::info;

use crate::cli::{Cli, Command};
use crate::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load(&cli).context("failed to load configuration")?;

    logging::init_logging(&config.log.level)?;
    phoenix_lock::metrics::describe_metrics();

    if let Command::Import {
        file,
        dry_run: true,
    } = &cli.command
    {
        let results = read_results(file.as_deref()).await?;
        info!("Dry run, the cache is not touched");
        return print_json(&ImportSummary::planned(&results));
    }

    info!(url = %config.store.url, "Connecting to cache");
    let store: Arc<dyn KvStore> = Arc::new(
        RedisKvStore::connect(&config.store.url, config.store.pool_size)
            .await
            .with_context(|| format!("failed to connect to {}", config.store.url))?,
    );

    match cli.command {
        Command::Import { file, .. } => {
            let results = read_results(file.as_deref()).await?;
            let importer = ResultsImporter::new(GuardedCache::new(store, config.lock));
            let summary = importer.import(&results).await?;
            print_json(&summary)
        }
        Command::DumpDsm => {
            let map = DataSourceMapReader::new(store).load().await?;
            print_json(&map)
        }
        Command::DeviceMap { grid, cluster } => {
            let names = DataSourceMapReader::new(store)
                .device_names(&grid, &cluster)
                .await?;
            print_json(&names)
        }
    }
}

async fn read_results(file: Option<&Path>) -> anyhow::Result<ResultsDocument> {
    let input = read_input(file).await?;
    ResultsDocument::from_json(&input).context("invalid results document")
}

async fn read_input(file: Option<&Path>) -> anyhow::Result<String> {
    match file {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read {}", path.display())),
        None => {
            let mut input = String::new();
            tokio::io::stdin()
                .read_to_string(&mut input)
                .await
                .context("failed to read stdin")?;
            Ok(input)
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
