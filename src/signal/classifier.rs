//! Signal classifier - oscillator to discrete action
//!
//! Thresholds are exclusive: exactly 30 or 70 is HOLD.

use crate::config::IndicatorConfig;
use crate::types::SignalAction;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    /// Strictly below -> BUY
    pub buy: f64,
    /// Strictly above -> SELL
    pub sell: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            buy: 30.0,
            sell: 70.0,
        }
    }
}

impl From<&IndicatorConfig> for Thresholds {
    fn from(cfg: &IndicatorConfig) -> Self {
        Self {
            buy: cfg.buy_threshold,
            sell: cfg.sell_threshold,
        }
    }
}

/// Map an oscillator reading to an action. Undefined (or NaN) is HOLD.
pub fn classify(oscillator: Option<f64>, thresholds: &Thresholds) -> SignalAction {
    match oscillator {
        Some(x) if x > thresholds.sell => SignalAction::Sell,
        Some(x) if x < thresholds.buy => SignalAction::Buy,
        _ => SignalAction::Hold,
    }
}
