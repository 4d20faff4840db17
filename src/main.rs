mod config;
mod error;
mod index_store;
mod metadata;
mod orchestrator;
mod processor;
mod provider;
mod providers;
mod selection;
#[cfg(test)]
mod test_support;
mod walker;

use crate::config::{AppConfig, ProviderKeys, SelectionStrategy};
use crate::error::AppError;
use crate::index_store::{Index, IndexStore};
use crate::orchestrator::Orchestrator;
use crate::processor::HttpImageProcessor;
use anyhow::Result;
use clap::{Parser, Subcommand};
use log::info;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(version, about = "Fetches bird photos from stock-photo APIs into an indexed image folder")]
struct Cli {
    /// Directory holding default.toml and optional overrides
    #[arg(long, default_value = "config")]
    config_dir: PathBuf,

    /// Overrides the configured log level
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch new images for every category (the default)
    Run {
        /// Provider selection policy for this run
        #[arg(long, value_enum)]
        strategy: Option<SelectionStrategy>,

        /// Only fetch for these categories
        #[arg(long = "category")]
        categories: Vec<String>,
    },
    /// Show index counts and images on disk that are not indexed
    Status,
}

async fn run(config: AppConfig, strategy: Option<SelectionStrategy>, categories: Vec<String>) -> Result<()> {
    let keys = ProviderKeys::from_env();
    info!("{} provider API keys configured", keys.iter().count());
    let client = reqwest::Client::builder()
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()?;
    let providers = providers::build_providers(&config, &keys, &client);
    let sink = Arc::new(HttpImageProcessor::new(
        client,
        config.download_timeout(),
        config.jpeg_quality,
    ));

    let strategy = strategy.unwrap_or(config.selection);
    info!("Using {:?} provider selection", strategy);

    let summary = Orchestrator::new(config, providers, sink)
        .with_strategy(strategy)
        .only_categories(categories)
        .run()
        .await
        .map_err(|e: AppError| {
            if e.is_fatal() {
                log::error!("{}", e);
            }
            e
        })?;

    for category in &summary.categories {
        match category.provider {
            Some(provider) => info!("{}: {} new images from {}", category.name, category.saved, provider),
            None => info!("{}: no new images", category.name),
        }
    }
    Ok(())
}

fn status(config: &AppConfig) -> Result<()> {
    let store = IndexStore::new(&config.index_path);
    let index = Index::from_entries(store.load()?);

    println!("Index: {} ({} images)", store.path().display(), index.len());
    let mut counts: Vec<_> = index.counts_by_category().into_iter().collect();
    counts.sort();
    for (category, count) in counts {
        println!("  {:<12} {}", category, count);
    }

    let orphans = walker::find_orphans(
        Path::new(&config.images_directory),
        &config.allowed_extensions,
        &index,
    )?;
    if orphans.is_empty() {
        println!("No unindexed images under {}", config.images_directory);
    } else {
        println!("{} unindexed images:", orphans.len());
        for orphan in orphans {
            println!("  {}", orphan.display());
        }
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::new(&cli.config_dir)?;

    let level = cli.log_level.as_deref().unwrap_or(&config.log_level);
    env_logger::Builder::new()
        .filter_level(level.parse().unwrap_or(log::LevelFilter::Info))
        .init();

    info!("Starting bird-fetcher");

    match cli.command.unwrap_or(Command::Run {
        strategy: None,
        categories: Vec::new(),
    }) {
        Command::Run { strategy, categories } => run(config, strategy, categories).await?,
        Command::Status => status(&config)?,
    }

    info!("bird-fetcher finished");

    Ok(())
}
