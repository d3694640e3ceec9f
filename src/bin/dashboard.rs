//! Dashboard API
//!
//! Usage: cargo run --features dashboard --bin dashboard

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

use rsibot::config::AppConfig;
use rsibot::dashboard::{start_server, DashboardState};
use rsibot::logging;
use rsibot::store::CsvStore;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    logging::init_logging();

    let config = AppConfig::load()?;
    info!(config = %config.digest(), "🖥️ Dashboard starting");

    let store = Arc::new(
        CsvStore::new(&config.storage.data_dir)
            .with_context(|| format!("Failed to open data dir {}", config.storage.data_dir))?,
    );
    let state = DashboardState {
        signals: store.clone(),
        trades: store.clone(),
        prices: store,
        instruments: config.bot.instruments.clone(),
    };

    tokio::select! {
        result = start_server(state, config.dashboard.port) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Dashboard stopped");
            Ok(())
        }
    }
}
