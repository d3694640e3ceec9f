//! Dashboard response types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::types::{NotionalUnit, SignalAction, SignalDocument, TradeRecord, TradeSide};

/// JSON envelope returned by every endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub instruments: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

/// Query for `/api/signals`
#[derive(Debug, Default, Deserialize)]
pub struct SignalsQuery {
    pub pair: Option<String>,
    /// Action code (0 HOLD, 1 BUY, 2 SELL)
    pub action: Option<i32>,
    pub limit: Option<usize>,
}

/// Query for `/api/trades`
#[derive(Debug, Default, Deserialize)]
pub struct TradesQuery {
    pub pair: Option<String>,
    pub limit: Option<usize>,
}

/// Query for `/api/prices`
#[derive(Debug, Default, Deserialize)]
pub struct PriceHistoryQuery {
    pub pair: String,
    pub limit: Option<usize>,
}

/// Aggregates over every executed trade
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TradeStats {
    pub total_trades: usize,
    pub buy_count: usize,
    pub sell_count: usize,
    /// Sum of USD or quote notionals, base notionals valued at the trade price
    pub total_volume: Decimal,
    pub average_price: Decimal,
    pub pairs: Vec<String>,
}

impl TradeStats {
    pub fn from_trades(trades: &[TradeRecord]) -> Self {
        if trades.is_empty() {
            return Self::default();
        }

        let mut stats = Self {
            total_trades: trades.len(),
            ..Self::default()
        };
        let mut price_sum = Decimal::ZERO;
        let mut pairs = BTreeSet::new();

        for trade in trades {
            match trade.action {
                TradeSide::Buy => stats.buy_count += 1,
                TradeSide::Sell => stats.sell_count += 1,
            }
            stats.total_volume += match trade.notional_unit {
                NotionalUnit::Usd | NotionalUnit::Quote => trade.notional,
                NotionalUnit::Base => trade.notional * trade.price,
            };
            price_sum += trade.price;
            pairs.insert(trade.instrument.clone());
        }

        stats.average_price = (price_sum / Decimal::from(trades.len())).normalize();
        stats.total_volume = stats.total_volume.normalize();
        stats.pairs = pairs.into_iter().collect();
        stats
    }
}

/// Signal counts for one action code
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionStats {
    pub action: i32,
    pub label: String,
    pub count: usize,
    pub avg_oscillator: f64,
}

/// Aggregates over every published signal
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalStats {
    pub total_count: usize,
    pub pairs: Vec<String>,
    pub earliest_timestamp: Option<DateTime<Utc>>,
    pub latest_timestamp: Option<DateTime<Utc>>,
    pub avg_oscillator: Option<f64>,
    pub min_oscillator: Option<f64>,
    pub max_oscillator: Option<f64>,
    pub by_action: Vec<ActionStats>,
}

impl SignalStats {
    pub fn from_signals(signals: &[SignalDocument]) -> Self {
        if signals.is_empty() {
            return Self::default();
        }

        let mut pairs = BTreeSet::new();
        let mut by_action: BTreeMap<i32, (usize, f64)> = BTreeMap::new();
        let mut sum = 0.0;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;

        for signal in signals {
            pairs.insert(signal.instrument.clone());
            sum += signal.oscillator;
            min = min.min(signal.oscillator);
            max = max.max(signal.oscillator);
            let entry = by_action.entry(signal.action).or_insert((0, 0.0));
            entry.0 += 1;
            entry.1 += signal.oscillator;
        }

        let count = signals.len() as f64;
        Self {
            total_count: signals.len(),
            pairs: pairs.into_iter().collect(),
            earliest_timestamp: signals.iter().map(|s| s.timestamp).min(),
            latest_timestamp: signals.iter().map(|s| s.timestamp).max(),
            avg_oscillator: Some(sum / count),
            min_oscillator: Some(min),
            max_oscillator: Some(max),
            by_action: by_action
                .into_iter()
                .map(|(action, (n, total))| ActionStats {
                    action,
                    label: SignalAction::from_code(action)
                        .map(|a| a.to_string())
                        .unwrap_or_else(|| "UNKNOWN".to_string()),
                    count: n,
                    avg_oscillator: total / n as f64,
                })
                .collect(),
        }
    }
}

/// Query for `/api/prices/current`
#[derive(Debug, Default, Deserialize)]
pub struct PriceQuery {
    pub pair: String,
}
