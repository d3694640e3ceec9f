//! Core types used throughout RsiBot
//!
//! Defines the price, bar, signal and trade documents shared by the
//! signal pipeline and the trade automation loop.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Raw price point written by the external ingester.
///
/// `price` is kept as the ingester wrote it (usually an 18-decimal
/// fixed-point integer string); unparseable values are dropped by the
/// resampler rather than rejected at read time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPricePoint {
    pub instrument: String,
    pub timestamp: DateTime<Utc>,
    pub price: String,
}

impl RawPricePoint {
    pub fn new(instrument: impl Into<String>, timestamp: DateTime<Utc>, price: impl ToString) -> Self {
        Self {
            instrument: instrument.into(),
            timestamp,
            price: price.to_string(),
        }
    }

    /// Parse the stored price, accepting plain and scientific notation.
    pub fn parsed_price(&self) -> Option<Decimal> {
        let raw = self.price.trim();
        if raw.is_empty() {
            return None;
        }
        Decimal::from_str(raw)
            .or_else(|_| Decimal::from_scientific(raw))
            .ok()
    }
}

/// One bar of the resampled series: the last observation inside a bucket.
#[derive(Debug, Clone, PartialEq)]
pub struct ResampledBar {
    pub instrument: String,
    /// Timestamp of the last raw point in the bucket (not the bucket floor)
    pub timestamp: DateTime<Utc>,
    pub price: Decimal,
}

/// Oscillator output for one bar. `None` while history is insufficient.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndicatorValue {
    pub timestamp: DateTime<Utc>,
    pub oscillator: Option<f64>,
}

/// Discrete trading action derived from the oscillator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SignalAction {
    Hold,
    Buy,
    Sell,
}

impl Default for SignalAction {
    fn default() -> Self {
        SignalAction::Hold
    }
}

impl SignalAction {
    /// Integer code stored in signal documents (HOLD=0, BUY=1, SELL=2)
    pub fn code(&self) -> i32 {
        match self {
            SignalAction::Hold => 0,
            SignalAction::Buy => 1,
            SignalAction::Sell => 2,
        }
    }

    /// Decode a stored action code. Unknown codes yield `None`.
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(SignalAction::Hold),
            1 => Some(SignalAction::Buy),
            2 => Some(SignalAction::Sell),
            _ => None,
        }
    }
}

impl fmt::Display for SignalAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalAction::Hold => write!(f, "HOLD"),
            SignalAction::Buy => write!(f, "BUY"),
            SignalAction::Sell => write!(f, "SELL"),
        }
    }
}

/// Persisted signal document. Append-only; never mutated after insert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalDocument {
    /// Storage identity, distinct for every insert
    pub id: Uuid,
    pub instrument: String,
    pub timestamp: DateTime<Utc>,
    /// Raw (fixed-point) price of the last bar
    #[serde(with = "rust_decimal::serde::str")]
    pub price: Decimal,
    pub oscillator: f64,
    /// Action code, see [`SignalAction::code`]
    pub action: i32,
}

impl SignalDocument {
    pub fn new(
        instrument: impl Into<String>,
        timestamp: DateTime<Utc>,
        price: Decimal,
        oscillator: f64,
        action: SignalAction,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            instrument: instrument.into(),
            timestamp,
            price,
            oscillator,
            action: action.code(),
        }
    }

    /// Decoded action; `None` for codes written by something other than this pipeline.
    pub fn signal_action(&self) -> Option<SignalAction> {
        SignalAction::from_code(self.action)
    }
}

/// Side of an executed trade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeSide {
    Buy,
    Sell,
}

impl TradeSide {
    /// Map a signal action to a trade side. HOLD produces no trade.
    pub fn from_action(action: SignalAction) -> Option<Self> {
        match action {
            SignalAction::Buy => Some(TradeSide::Buy),
            SignalAction::Sell => Some(TradeSide::Sell),
            SignalAction::Hold => None,
        }
    }
}

impl fmt::Display for TradeSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeSide::Buy => write!(f, "BUY"),
            TradeSide::Sell => write!(f, "SELL"),
        }
    }
}

/// How a trade was carried out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ExecutionMode {
    Simulated,
    Onchain,
}

impl FromStr for ExecutionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "simulated" | "simulation" | "paper" => Ok(ExecutionMode::Simulated),
            "onchain" | "on-chain" | "chain" => Ok(ExecutionMode::Onchain),
            other => Err(format!("unknown execution mode '{}'", other)),
        }
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionMode::Simulated => write!(f, "SIMULATED"),
            ExecutionMode::Onchain => write!(f, "ONCHAIN"),
        }
    }
}

/// Unit the trade notional is expressed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum NotionalUnit {
    Usd,
    Quote,
    Base,
}

/// Executed trade. Written once per BUY/SELL decision, never updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub id: Uuid,
    pub instrument: String,
    pub action: TradeSide,
    pub mode: ExecutionMode,
    #[serde(with = "rust_decimal::serde::str")]
    pub notional: Decimal,
    pub notional_unit: NotionalUnit,
    /// Human-readable price (raw fixed-point price scaled down)
    #[serde(with = "rust_decimal::serde::str")]
    pub price: Decimal,
    /// Copied from the triggering signal
    pub timestamp: DateTime<Utc>,
    /// Copied from the triggering signal
    pub oscillator: f64,
    #[serde(default)]
    pub transaction_hash: Option<String>,
    pub executed_at: DateTime<Utc>,
}
