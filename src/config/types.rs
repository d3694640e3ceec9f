//! Per-section configuration types
//!
//! Every field has a default set in [`super::AppConfig`]'s builder, so a bare
//! environment still yields a complete configuration.

use rust_decimal::Decimal;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    /// Instruments processed each run, in this order
    pub instruments: Vec<String>,
    /// Sleep between runs in seconds
    pub poll_interval_secs: u64,
    /// Log a countdown while waiting for the next run
    pub countdown: bool,
    /// Countdown log cadence in seconds
    pub countdown_step_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IndicatorConfig {
    /// RSI window
    pub window: usize,
    /// Oscillator strictly below this is BUY
    pub buy_threshold: f64,
    /// Oscillator strictly above this is SELL
    pub sell_threshold: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HistoryConfig {
    /// Raw points fetched per instrument per run
    pub fetch_limit: usize,
    /// Minimum raw points before resampling is attempted
    pub min_raw_points: usize,
    /// Minimum resampled bars required to compute a signal
    pub min_bars: usize,
    /// Bar width in seconds
    pub bar_interval_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Data directory holding prices/, signals/ and trades/
    pub data_dir: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionConfig {
    /// "simulated" or "onchain"
    pub mode: String,
    /// Fixed USD notional for simulated trades
    pub notional_usd: Decimal,
    /// Decimals of the fixed-point price stored in signals
    pub price_decimals: u32,
    /// BUY amount in quote token units (swap quote -> base)
    pub buy_amount: Decimal,
    /// SELL amount in base token units (swap base -> quote)
    pub sell_amount: Decimal,
    /// Fixed gas limit; gas is never estimated
    pub gas_limit: u64,
    pub chain_id: u64,
    pub rpc_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContractConfig {
    /// Swap contract address (0x-prefixed)
    pub address: String,
    #[serde(default = "default_quote_decimals")]
    pub quote_decimals: u32,
    #[serde(default = "default_base_decimals")]
    pub base_decimals: u32,
}

fn default_quote_decimals() -> u32 {
    6
}

fn default_base_decimals() -> u32 {
    18
}

#[derive(Debug, Clone, Deserialize)]
pub struct DashboardConfig {
    pub port: u16,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self { port: 3001 }
    }
}
