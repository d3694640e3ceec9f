//! Configuration management for RsiBot
//!
//! Loads from config files + environment variables via .env

mod types;

pub use types::*;

use anyhow::{bail, Context, Result};
use config::{Config, Environment, File};
use ethers::types::Address;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

use crate::types::ExecutionMode;

/// Environment variable holding the signing key for on-chain execution
pub const PRIVATE_KEY_ENV: &str = "PRIVATE_KEY";

/// Largest bucket width accepted for `history.bar_interval_secs` (one week)
pub const MAX_BAR_INTERVAL_SECS: u64 = 7 * 24 * 60 * 60;

/// Fixed-point decimals a `Decimal` can scale down by
pub const MAX_PRICE_DECIMALS: u32 = 28;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub bot: BotConfig,
    pub indicator: IndicatorConfig,
    pub history: HistoryConfig,
    pub storage: StorageConfig,
    pub execution: ExecutionConfig,
    /// Contract bindings keyed by instrument (e.g. "BTC/USDT")
    #[serde(default)]
    pub contracts: HashMap<String, ContractConfig>,
    #[serde(default)]
    pub dashboard: DashboardConfig,
}

impl AppConfig {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self> {
        // Load .env file first
        dotenvy::dotenv().ok();

        let config = Self::builder()?
            // Load config file if exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // Override with environment variables (RSIBOT__*)
            .add_source(Environment::with_prefix("RSIBOT").separator("__"))
            .build()
            .context("Failed to build configuration")?;

        let app_config: AppConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        app_config.validate()?;
        Ok(app_config)
    }

    /// Defaults only, no files or environment
    pub fn defaults() -> Result<Self> {
        Self::builder()?
            .build()
            .context("Failed to build default configuration")?
            .try_deserialize()
            .context("Failed to deserialize default configuration")
    }

    fn builder() -> Result<config::ConfigBuilder<config::builder::DefaultState>> {
        Ok(Config::builder()
            // Bot defaults
            .set_default("bot.instruments", vec!["BTC/USDT", "ETH/USDT", "SOL/USDT"])?
            .set_default("bot.poll_interval_secs", 300)?
            .set_default("bot.countdown", true)?
            .set_default("bot.countdown_step_secs", 60)?
            // Indicator defaults
            .set_default("indicator.window", 14)?
            .set_default("indicator.buy_threshold", 30.0)?
            .set_default("indicator.sell_threshold", 70.0)?
            // History defaults
            .set_default("history.fetch_limit", 100)?
            .set_default("history.min_raw_points", 15)?
            .set_default("history.min_bars", 15)?
            .set_default("history.bar_interval_secs", 300)?
            // Storage defaults
            .set_default("storage.data_dir", "./data")?
            // Execution defaults
            .set_default("execution.mode", "simulated")?
            .set_default("execution.notional_usd", "100")?
            .set_default("execution.price_decimals", 18)?
            .set_default("execution.buy_amount", "100")?
            .set_default("execution.sell_amount", "1")?
            .set_default("execution.gas_limit", 200_000)?
            .set_default("execution.chain_id", 97)?
            .set_default(
                "execution.rpc_url",
                "https://data-seed-prebsc-1-s1.binance.org:8545",
            )?
            // Dashboard defaults
            .set_default("dashboard.port", 3001)?)
    }

    /// Sanity checks that apply to every binary
    pub fn validate(&self) -> Result<()> {
        if self.bot.instruments.is_empty() {
            bail!("bot.instruments must list at least one instrument");
        }
        if self.bot.poll_interval_secs == 0 {
            bail!("bot.poll_interval_secs must be greater than zero");
        }
        if self.history.bar_interval_secs == 0
            || self.history.bar_interval_secs > MAX_BAR_INTERVAL_SECS
        {
            bail!(
                "history.bar_interval_secs ({}) must be between 1 and {}",
                self.history.bar_interval_secs,
                MAX_BAR_INTERVAL_SECS
            );
        }
        if self.execution.price_decimals > MAX_PRICE_DECIMALS {
            bail!(
                "execution.price_decimals ({}) must not exceed {}",
                self.execution.price_decimals,
                MAX_PRICE_DECIMALS
            );
        }
        let ind = &self.indicator;
        if ind.window == 0 {
            bail!("indicator.window must be at least 1");
        }
        if !(0.0..=100.0).contains(&ind.buy_threshold)
            || !(0.0..=100.0).contains(&ind.sell_threshold)
            || ind.buy_threshold >= ind.sell_threshold
        {
            bail!(
                "indicator thresholds must satisfy 0 <= buy ({}) < sell ({}) <= 100",
                ind.buy_threshold,
                ind.sell_threshold
            );
        }
        if self.history.min_bars < ind.window + 1 {
            bail!(
                "history.min_bars ({}) must be at least indicator.window + 1 ({})",
                self.history.min_bars,
                ind.window + 1
            );
        }
        if self.history.fetch_limit < self.history.min_raw_points {
            bail!(
                "history.fetch_limit ({}) is below history.min_raw_points ({})",
                self.history.fetch_limit,
                self.history.min_raw_points
            );
        }
        self.execution_mode()?;
        Ok(())
    }

    pub fn execution_mode(&self) -> Result<ExecutionMode> {
        self.execution
            .mode
            .parse::<ExecutionMode>()
            .map_err(|e| anyhow::anyhow!("execution.mode: {}", e))
    }

    /// Startup checks for on-chain execution. Any failure is fatal.
    pub fn validate_execution(&self) -> Result<()> {
        if self.execution_mode()? != ExecutionMode::Onchain {
            return Ok(());
        }

        let pk = std::env::var(PRIVATE_KEY_ENV)
            .with_context(|| format!("Required environment variable {} is not set", PRIVATE_KEY_ENV))?;
        if !pk.starts_with("0x") || pk.len() != 66 {
            bail!("PRIVATE_KEY must be a hex string with 0x prefix (66 chars total)");
        }

        for instrument in &self.bot.instruments {
            self.contract_address(instrument)?;
        }
        if self.execution.gas_limit == 0 {
            bail!("execution.gas_limit must be greater than zero");
        }
        Ok(())
    }

    /// Contract binding for an instrument. Config keys may have been case-folded.
    pub fn contract(&self, instrument: &str) -> Option<&ContractConfig> {
        self.contracts.get(instrument).or_else(|| {
            self.contracts
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(instrument))
                .map(|(_, binding)| binding)
        })
    }

    /// Resolve and parse the contract address bound to an instrument
    pub fn contract_address(&self, instrument: &str) -> Result<Address> {
        let binding = self
            .contract(instrument)
            .with_context(|| format!("No contract binding configured for {}", instrument))?;
        binding
            .address
            .parse::<Address>()
            .with_context(|| format!("Invalid contract address '{}' for {}", binding.address, instrument))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.bot.poll_interval_secs)
    }

    /// Resampling bucket width, bounded by `validate`
    pub fn bar_interval(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.history.bar_interval_secs.min(MAX_BAR_INTERVAL_SECS) as i64)
    }

    /// Generate a digest of the config (without secrets) for logging
    pub fn digest(&self) -> String {
        format!(
            "instruments={:?} poll={}s rsi={} buy<{} sell>{} fetch={} min_bars={} mode={}",
            self.bot.instruments,
            self.bot.poll_interval_secs,
            self.indicator.window,
            self.indicator.buy_threshold,
            self.indicator.sell_threshold,
            self.history.fetch_limit,
            self.history.min_bars,
            self.execution.mode
        )
    }
}

impl std::fmt::Display for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.digest())
    }
}
