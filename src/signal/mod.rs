//! Signal generation pipeline
//!
//! Per instrument: FETCH -> RESAMPLE -> COMPUTE_INDICATOR -> CLASSIFY -> PUBLISH.
//! Instruments are processed sequentially in configured order, and a fault in
//! one never aborts the run.

pub mod classifier;
pub mod feed;
pub mod indicator;
pub mod publisher;
pub mod resampler;

pub use classifier::{classify, Thresholds};
pub use feed::FeedReader;
pub use indicator::RsiEngine;
pub use publisher::SignalPublisher;
pub use resampler::Resampler;

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::config::AppConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::scheduler::CycleJob;
use crate::store::{PriceStore, SignalStore};
use crate::types::SignalDocument;

/// Outcome counts of one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub processed: usize,
    pub published: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Signal generation orchestrator
pub struct SignalGenerator {
    instruments: Vec<String>,
    feed: FeedReader,
    resampler: Resampler,
    engine: RsiEngine,
    thresholds: Thresholds,
    publisher: SignalPublisher,
}

impl SignalGenerator {
    pub fn new(
        instruments: Vec<String>,
        feed: FeedReader,
        resampler: Resampler,
        engine: RsiEngine,
        thresholds: Thresholds,
        publisher: SignalPublisher,
    ) -> Self {
        Self {
            instruments,
            feed,
            resampler,
            engine,
            thresholds,
            publisher,
        }
    }

    /// Wire the pipeline from configuration and the process-wide stores
    pub fn from_config(
        config: &AppConfig,
        prices: Arc<dyn PriceStore>,
        signals: Arc<dyn SignalStore>,
    ) -> Self {
        Self::new(
            config.bot.instruments.clone(),
            FeedReader::new(prices, config.history.fetch_limit),
            Resampler::new(
                config.bar_interval(),
                config.history.min_raw_points,
                config.history.min_bars,
            ),
            RsiEngine::new(config.indicator.window),
            Thresholds::from(&config.indicator),
            SignalPublisher::new(signals),
        )
    }

    /// One pass over every instrument
    pub async fn run_once(&self) -> RunSummary {
        let mut summary = RunSummary::default();

        for instrument in &self.instruments {
            summary.processed += 1;
            match self.process_instrument(instrument).await {
                Ok(signal) => {
                    summary.published += 1;
                    info!(
                        instrument = %instrument,
                        oscillator = signal.oscillator,
                        action = signal.action,
                        price = %signal.price,
                        "Signal published"
                    );
                }
                Err(e) if e.is_skip() => {
                    summary.skipped += 1;
                    warn!(instrument = %instrument, reason = %e, "Skipping instrument");
                }
                Err(e) => {
                    summary.failed += 1;
                    error!(instrument = %instrument, error = %e, "Signal generation failed");
                }
            }
        }

        info!(
            processed = summary.processed,
            published = summary.published,
            skipped = summary.skipped,
            failed = summary.failed,
            "Signal run complete"
        );
        summary
    }

    /// Run the full pipeline for one instrument and publish its signal
    pub async fn process_instrument(&self, instrument: &str) -> PipelineResult<SignalDocument> {
        let points = self.feed.fetch(instrument).await?;
        debug!(instrument = %instrument, points = points.len(), "Fetched raw prices");

        let bars = self.resampler.resample(instrument, &points)?;
        debug!(instrument = %instrument, bars = bars.len(), "Resampled");

        let latest = self.engine.latest(&bars);
        let (last_bar, oscillator) = match (bars.last(), latest.and_then(|v| v.oscillator)) {
            (Some(bar), Some(osc)) => (bar, osc),
            _ => {
                return Err(PipelineError::InsufficientData {
                    instrument: instrument.to_string(),
                    stage: "indicator history",
                    available: bars.len(),
                    required: self.engine.window() + 1,
                })
            }
        };

        let action = classify(Some(oscillator), &self.thresholds);
        let signal = SignalDocument::new(
            instrument,
            last_bar.timestamp,
            last_bar.price,
            oscillator,
            action,
        );

        self.publisher.publish(&signal).await?;
        Ok(signal)
    }
}

#[async_trait]
impl CycleJob for SignalGenerator {
    fn name(&self) -> &'static str {
        "signal-generator"
    }

    async fn run_cycle(&self) -> Result<()> {
        self.run_once().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::types::{RawPricePoint, SignalAction};
    use chrono::{Duration, TimeZone, Utc};

    fn generator(store: Arc<MemoryStore>, instruments: &[&str]) -> SignalGenerator {
        let mut config = AppConfig::defaults().unwrap();
        config.bot.instruments = instruments.iter().map(|s| s.to_string()).collect();
        SignalGenerator::from_config(&config, store.clone(), store)
    }

    fn series(instrument: &str, prices: impl Iterator<Item = i64>) -> Vec<RawPricePoint> {
        let base = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        prices
            .enumerate()
            .map(|(i, p)| RawPricePoint::new(instrument, base + Duration::minutes(5 * i as i64), p))
            .collect()
    }

    #[tokio::test]
    async fn rising_prices_publish_sell() {
        let store = Arc::new(MemoryStore::new());
        store.push_prices(series("ETH/USDT", (0..20).map(|i| 3000 + i * 10)));

        let summary = generator(store.clone(), &["ETH/USDT"]).run_once().await;
        assert_eq!(summary.published, 1);

        let signals = store.signals();
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].signal_action(), Some(SignalAction::Sell));
        assert_eq!(signals[0].oscillator, 100.0);
        assert_eq!(signals[0].price.to_string(), "3190");
    }

    #[tokio::test]
    async fn short_history_is_a_skip_without_a_document() {
        let store = Arc::new(MemoryStore::new());
        store.push_prices(series("SOL/USDT", (0..10).map(|i| 150 + i)));

        let summary = generator(store.clone(), &["SOL/USDT"]).run_once().await;
        assert_eq!(
            summary,
            RunSummary { processed: 1, published: 0, skipped: 1, failed: 0 }
        );
        assert!(store.signals().is_empty());
    }

    #[tokio::test]
    async fn reruns_append_distinct_documents() {
        let store = Arc::new(MemoryStore::new());
        store.push_prices(series("BTC/USDT", (0..20).map(|i| 60_000 - i * 25)));
        let generator = generator(store.clone(), &["BTC/USDT"]);

        generator.run_once().await;
        generator.run_once().await;

        let signals = store.signals();
        assert_eq!(signals.len(), 2);
        assert_ne!(signals[0].id, signals[1].id);
        assert_eq!(signals[0].timestamp, signals[1].timestamp);
        assert_eq!(signals[0].action, signals[1].action);
    }
}
