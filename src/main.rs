mod bookmark;
mod client;
mod config;
mod constant;
mod dispatch;
mod feed;
mod pipeline;
mod store;

use anyhow::Result;
use chrono::Utc;

use std::process::ExitCode;

use crate::bookmark::PocketClient;
use crate::config::Config;
use crate::feed::{load_sources, HttpFetcher};
use crate::pipeline::PipelineBuilder;

#[tokio::main]
async fn main() -> ExitCode {
    setup_env_and_tracing();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let config = Config::from_env()?;
    tracing::debug!(?config, "Loaded config");

    let sources = load_sources(&config.feeds_path)?;
    tracing::info!(feeds = sources.len(), path = %config.feeds_path.display(), "Loaded feed list");

    let pipeline = PipelineBuilder::new()
        .with_sources(sources)
        .with_fetcher(HttpFetcher::new(config.fetch_timeout)?)
        .with_bookmarker(PocketClient::new(&config)?)
        .with_store_path(&config.store_path)
        .build()?;

    let summary = pipeline.run_once(Utc::now()).await?;
    tracing::info!(
        feeds = summary.feeds_total,
        skipped = summary.feeds_skipped,
        forwarded = summary.forwarded,
        failed = summary.failed,
        "Run finished"
    );

    Ok(())
}

pub fn setup_env_and_tracing() {
    dotenv::dotenv().ok();
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
