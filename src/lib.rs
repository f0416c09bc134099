pub mod cli;
pub mod core;
pub mod providers;
pub mod store;

use crate::core::cache::Store;
use crate::core::config::AppConfig;
use crate::core::snapshot::Snapshot;
use crate::core::{CacheSettings, QuoteClient};
use crate::providers::alpha_vantage::AlphaVantageProvider;
use crate::store::KeyValueStore;
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Name of the collection holding last-known-good series and prices.
pub const SNAPSHOT_COLLECTION: &str = "snapshots";

#[derive(Debug, Clone)]
pub enum AppCommand {
    Watchlist,
    Price { pair: String },
    History { pair: String, days: usize },
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("fxwatch starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let client = build_client(&config).await?;

    match command {
        AppCommand::Watchlist => cli::watchlist::run(&client, &config.tracked_pairs()?).await,
        AppCommand::Price { pair } => cli::price::run(&client, &pair).await,
        AppCommand::History { pair, days } => cli::history::run(&client, &pair, days).await,
    }
}

/// Opens the snapshot store and builds a client for the configured provider.
/// Falls back to an in-memory snapshot if the data directory is unusable.
pub async fn build_client(config: &AppConfig) -> Result<QuoteClient> {
    let tracked = config.tracked_pairs()?;

    let provider = AlphaVantageProvider::new(
        &config.providers.alpha_vantage.base_url,
        &config.api_key(),
        config.request_timeout(),
    )?;

    let store = match config
        .default_data_path()
        .and_then(|path| KeyValueStore::open(&path))
    {
        Ok(store) => store,
        Err(e) => {
            warn!(error = %e, "Snapshot store unavailable, keeping snapshots in memory");
            KeyValueStore::in_memory()
        }
    };
    let collection = store
        .get_collection(SNAPSHOT_COLLECTION, true, true)
        .or_else(|| store.get_collection(SNAPSHOT_COLLECTION, false, true))
        .context("Failed to open snapshot collection")?;

    Ok(QuoteClient::new(
        Arc::new(provider),
        Snapshot::new(collection),
        &tracked,
        CacheSettings::from(&config.cache),
    )
    .await)
}
