//! Signal generator
//!
//! Usage: cargo run --bin signal-generator
//!
//! Reads raw prices, computes RSI per instrument and publishes one signal
//! per instrument every poll interval.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

use rsibot::config::AppConfig;
use rsibot::logging;
use rsibot::scheduler::{Scheduler, ShutdownSignal};
use rsibot::signal::SignalGenerator;
use rsibot::store::CsvStore;

#[tokio::main]
async fn main() -> Result<()> {
    // .env may carry LOG_FORMAT / RUST_LOG, so load it before logging
    dotenvy::dotenv().ok();
    logging::init_logging();

    info!("📈 RsiBot signal generator starting");
    let config = AppConfig::load()?;
    info!(config = %config.digest(), "Configuration loaded");

    let store = Arc::new(
        CsvStore::new(&config.storage.data_dir)
            .with_context(|| format!("Failed to open data dir {}", config.storage.data_dir))?,
    );
    let generator = SignalGenerator::from_config(&config, store.clone(), store);

    let scheduler = Scheduler::new(config.poll_interval());
    let runs = scheduler.run(&generator, ShutdownSignal::from_os_signals()).await?;

    info!(runs, "Signal generator stopped");
    Ok(())
}
