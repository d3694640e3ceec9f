//! End-to-end pipeline tests over the in-memory store

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use rust_decimal_macros::dec;
use std::sync::Arc;

use rsibot::config::AppConfig;
use rsibot::signal::{RunSummary, SignalGenerator};
use rsibot::store::{MemoryStore, PriceStore, SignalStore};
use rsibot::trade::{LatestSignalResolver, TradeExecutor, TradeOrchestrator, TradeSummary};
use rsibot::types::{RawPricePoint, SignalAction, SignalDocument, TradeSide};

fn base() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
}

fn config(instruments: &[&str]) -> AppConfig {
    let mut config = AppConfig::defaults().unwrap();
    config.bot.instruments = instruments.iter().map(|s| s.to_string()).collect();
    config
}

/// One point per minute, priced as an 18-decimal fixed-point integer string
fn minute_series(instrument: &str, whole_prices: impl IntoIterator<Item = i64>) -> Vec<RawPricePoint> {
    whole_prices
        .into_iter()
        .enumerate()
        .map(|(i, p)| {
            RawPricePoint::new(
                instrument,
                base() + Duration::minutes(i as i64),
                format!("{}000000000000000000", p),
            )
        })
        .collect()
}

/// Price store that fails for one instrument
struct BrokenPrices {
    inner: Arc<MemoryStore>,
    broken: &'static str,
}

#[async_trait]
impl PriceStore for BrokenPrices {
    async fn recent(&self, instrument: &str, limit: usize) -> Result<Vec<RawPricePoint>> {
        if instrument == self.broken {
            bail!("connection reset while reading {}", instrument);
        }
        PriceStore::recent(self.inner.as_ref(), instrument, limit).await
    }
}

/// Signal store whose reads fail for one instrument
struct BrokenSignals {
    inner: Arc<MemoryStore>,
    broken: &'static str,
}

#[async_trait]
impl SignalStore for BrokenSignals {
    async fn insert(&self, signal: &SignalDocument) -> Result<()> {
        SignalStore::insert(self.inner.as_ref(), signal).await
    }

    async fn latest(&self, instrument: &str) -> Result<Option<SignalDocument>> {
        if instrument == self.broken {
            bail!("query timed out for {}", instrument);
        }
        self.inner.latest(instrument).await
    }

    async fn recent(&self, instrument: Option<&str>, limit: usize) -> Result<Vec<SignalDocument>> {
        SignalStore::recent(self.inner.as_ref(), instrument, limit).await
    }
}

/// Signal store whose writes fail for one instrument
struct RejectingInserts {
    inner: Arc<MemoryStore>,
    broken: &'static str,
}

#[async_trait]
impl SignalStore for RejectingInserts {
    async fn insert(&self, signal: &SignalDocument) -> Result<()> {
        if signal.instrument == self.broken {
            bail!("write concern failed for {}", signal.instrument);
        }
        SignalStore::insert(self.inner.as_ref(), signal).await
    }

    async fn latest(&self, instrument: &str) -> Result<Option<SignalDocument>> {
        self.inner.latest(instrument).await
    }

    async fn recent(&self, instrument: Option<&str>, limit: usize) -> Result<Vec<SignalDocument>> {
        SignalStore::recent(self.inner.as_ref(), instrument, limit).await
    }
}

#[tokio::test]
async fn decreasing_prices_flow_from_buy_signal_to_buy_trade() {
    let store = Arc::new(MemoryStore::new());
    // 100 minutes at one-minute spacing -> 20 five-minute bars
    store.push_prices(minute_series("BTC/USDT", (0..100).map(|i| 67_000 - i)));

    let config = config(&["BTC/USDT"]);
    let generator = SignalGenerator::from_config(&config, store.clone(), store.clone());
    let summary = generator.run_once().await;
    assert_eq!(summary, RunSummary { processed: 1, published: 1, skipped: 0, failed: 0 });

    let signals = store.signals();
    assert_eq!(signals.len(), 1);
    let signal = &signals[0];
    assert_eq!(signal.action, 1);
    assert_eq!(signal.signal_action(), Some(SignalAction::Buy));
    assert!(signal.oscillator < 30.0);
    // Last observation of the last bucket, with its own timestamp
    assert_eq!(signal.timestamp, base() + Duration::minutes(99));

    let orchestrator = TradeOrchestrator::new(
        config.bot.instruments.clone(),
        LatestSignalResolver::new(store.clone()),
        TradeExecutor::from_config(&config, store.clone()).unwrap(),
    );
    let summary = orchestrator.run_once().await;
    assert_eq!(summary.executed, 1);

    let trades = store.trades();
    assert_eq!(trades.len(), 1);
    assert_eq!(trades[0].action, TradeSide::Buy);
    assert_eq!(trades[0].notional, dec!(100));
    assert_eq!(trades[0].price, dec!(66901));
    assert_eq!(trades[0].timestamp, signal.timestamp);
    assert_eq!(trades[0].oscillator, signal.oscillator);

    let json = serde_json::to_value(&trades[0]).unwrap();
    assert_eq!(json["action"], "BUY");
}

#[tokio::test]
async fn fewer_than_fifteen_points_skips_without_a_document() {
    let store = Arc::new(MemoryStore::new());
    store.push_prices(minute_series("ETH/USDT", (0..14).map(|i| 3_000 + i)));

    let generator = SignalGenerator::from_config(&config(&["ETH/USDT"]), store.clone(), store.clone());
    let summary = generator.run_once().await;

    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.published, 0);
    assert!(store.signals().is_empty());
}

#[tokio::test]
async fn one_broken_feed_does_not_stop_the_next_instrument() {
    let store = Arc::new(MemoryStore::new());
    store.push_prices(minute_series("BTC/USDT", (0..100).map(|i| 60_000 + i)));
    store.push_prices(minute_series("ETH/USDT", (0..100).map(|i| 3_000 + i)));

    let prices = Arc::new(BrokenPrices {
        inner: store.clone(),
        broken: "BTC/USDT",
    });
    let generator = SignalGenerator::from_config(&config(&["BTC/USDT", "ETH/USDT"]), prices, store.clone());
    let summary = generator.run_once().await;

    assert_eq!(summary, RunSummary { processed: 2, published: 1, skipped: 0, failed: 1 });
    let signals = store.signals();
    assert_eq!(signals.len(), 1);
    assert_eq!(signals[0].instrument, "ETH/USDT");
    assert_eq!(signals[0].signal_action(), Some(SignalAction::Sell));
}

#[tokio::test]
async fn failed_publish_does_not_stop_the_next_instrument() {
    let store = Arc::new(MemoryStore::new());
    store.push_prices(minute_series("BTC/USDT", (0..100).map(|i| 60_000 - i)));
    store.push_prices(minute_series("ETH/USDT", (0..100).map(|i| 3_000 - i)));

    let signals = Arc::new(RejectingInserts {
        inner: store.clone(),
        broken: "BTC/USDT",
    });
    let generator = SignalGenerator::from_config(&config(&["BTC/USDT", "ETH/USDT"]), store.clone(), signals);
    let summary = generator.run_once().await;

    assert_eq!(summary, RunSummary { processed: 2, published: 1, skipped: 0, failed: 1 });
    let signals = store.signals();
    assert_eq!(signals.len(), 1);
    assert_eq!(signals[0].instrument, "ETH/USDT");
    assert_eq!(signals[0].signal_action(), Some(SignalAction::Buy));
}

#[tokio::test]
async fn one_broken_signal_lookup_does_not_stop_the_next_trade() {
    let store = Arc::new(MemoryStore::new());
    for instrument in ["BTC/USDT", "SOL/USDT"] {
        let doc = SignalDocument::new(instrument, base(), dec!(150000000000000000000), 22.0, SignalAction::Buy);
        SignalStore::insert(store.as_ref(), &doc).await.unwrap();
    }

    let signals = Arc::new(BrokenSignals {
        inner: store.clone(),
        broken: "BTC/USDT",
    });
    let orchestrator = TradeOrchestrator::new(
        vec!["BTC/USDT".to_string(), "SOL/USDT".to_string()],
        LatestSignalResolver::new(signals),
        TradeExecutor::simulated(store.clone(), dec!(100), 18),
    );
    let summary = orchestrator.run_once().await;

    assert_eq!(summary, TradeSummary { processed: 2, executed: 1, idle: 0, failed: 1 });
    let trades = store.trades();
    assert_eq!(trades.len(), 1);
    assert_eq!(trades[0].instrument, "SOL/USDT");
    assert_eq!(trades[0].price, dec!(150));
}

#[tokio::test]
async fn hold_signal_produces_no_trade() {
    let store = Arc::new(MemoryStore::new());
    // Alternating moves keep the oscillator near 50
    store.push_prices(minute_series(
        "SOL/USDT",
        (0..100).map(|i| if (i / 5) % 2 == 0 { 150 } else { 151 }),
    ));

    let config = config(&["SOL/USDT"]);
    SignalGenerator::from_config(&config, store.clone(), store.clone())
        .run_once()
        .await;
    assert_eq!(store.signals()[0].signal_action(), Some(SignalAction::Hold));

    let orchestrator = TradeOrchestrator::new(
        config.bot.instruments.clone(),
        LatestSignalResolver::new(store.clone()),
        TradeExecutor::from_config(&config, store.clone()).unwrap(),
    );
    let summary = orchestrator.run_once().await;
    assert_eq!(summary.idle, 1);
    assert!(store.trades().is_empty());
}
