//! Trade automation
//!
//! Usage: cargo run --bin trade-automation
//!
//! Acts on the latest published signal per instrument, either as a simulated
//! ledger entry or as an on-chain swap (`execution.mode = "onchain"`).

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use rsibot::config::AppConfig;
use rsibot::logging;
use rsibot::scheduler::{Scheduler, ShutdownSignal};
use rsibot::store::CsvStore;
use rsibot::trade::{LatestSignalResolver, TradeExecutor, TradeOrchestrator};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    logging::init_logging();

    info!("💱 RsiBot trade automation starting");
    let config = AppConfig::load()?;
    config.validate_execution().context("Execution configuration rejected")?;
    info!(config = %config.digest(), "Configuration loaded");

    let store = Arc::new(
        CsvStore::new(&config.storage.data_dir)
            .with_context(|| format!("Failed to open data dir {}", config.storage.data_dir))?,
    );
    let executor = TradeExecutor::from_config(&config, store.clone())?;
    info!(mode = %executor.mode(), "Executor ready");

    let orchestrator = TradeOrchestrator::new(
        config.bot.instruments.clone(),
        LatestSignalResolver::new(store),
        executor,
    );

    let mut scheduler = Scheduler::new(config.poll_interval());
    if config.bot.countdown {
        scheduler = scheduler.with_countdown(Duration::from_secs(config.bot.countdown_step_secs));
    }
    let runs = scheduler.run(&orchestrator, ShutdownSignal::from_os_signals()).await?;

    info!(runs, "Trade automation stopped");
    Ok(())
}
