//! Indicator engine - RSI with Wilder's smoothing
//!
//! Gains and losses are smoothed recursively from the first bar, with the
//! first change taken as zero: `avg = avg + (x - avg) / window`. The value is
//! reported once `window + 1` bars are seen. No losses reads 100.

use rust_decimal::prelude::ToPrimitive;

use crate::types::{IndicatorValue, ResampledBar};

/// RSI engine over resampled closes
#[derive(Debug, Clone, Copy)]
pub struct RsiEngine {
    window: usize,
}

impl RsiEngine {
    pub fn new(window: usize) -> Self {
        Self {
            window: window.max(1),
        }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Oscillator for every bar; `None` until `window + 1` bars are seen
    pub fn series(&self, bars: &[ResampledBar]) -> Vec<IndicatorValue> {
        let closes: Vec<f64> = bars
            .iter()
            .map(|b| b.price.to_f64().unwrap_or(f64::NAN))
            .collect();

        rsi_wilders(&closes, self.window)
            .into_iter()
            .zip(bars)
            .map(|(oscillator, bar)| IndicatorValue {
                timestamp: bar.timestamp,
                oscillator,
            })
            .collect()
    }

    /// Oscillator at the most recent bar
    pub fn latest(&self, bars: &[ResampledBar]) -> Option<IndicatorValue> {
        self.series(bars).pop()
    }
}

impl Default for RsiEngine {
    fn default() -> Self {
        Self::new(14)
    }
}

/// RSI series with Wilder's smoothing
pub fn rsi_wilders(closes: &[f64], window: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; closes.len()];
    if window == 0 || closes.len() < window + 1 {
        return out;
    }

    let alpha = 1.0 / window as f64;
    let mut avg_gain = 0.0;
    let mut avg_loss = 0.0;
    for i in 1..closes.len() {
        let change = closes[i] - closes[i - 1];
        let gain = if change > 0.0 { change } else { 0.0 };
        let loss = if change < 0.0 { -change } else { 0.0 };
        avg_gain += alpha * (gain - avg_gain);
        avg_loss += alpha * (loss - avg_loss);
        if i >= window {
            out[i] = oscillator(avg_gain, avg_loss);
        }
    }

    out
}

fn oscillator(avg_gain: f64, avg_loss: f64) -> Option<f64> {
    if !avg_gain.is_finite() || !avg_loss.is_finite() {
        return None;
    }
    if avg_loss == 0.0 {
        return Some(100.0);
    }
    let rs = avg_gain / avg_loss;
    Some((100.0 - 100.0 / (1.0 + rs)).clamp(0.0, 100.0))
}
