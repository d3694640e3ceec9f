//! In-process store
//!
//! Same find/sort/limit/insert semantics as the CSV backend, without I/O.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::{PoisonError, RwLock};

use super::{newest_first, PriceStore, SignalStore, TradeStore};
use crate::types::{RawPricePoint, SignalDocument, TradeRecord};

#[derive(Default)]
pub struct MemoryStore {
    prices: RwLock<Vec<RawPricePoint>>,
    signals: RwLock<Vec<SignalDocument>>,
    trades: RwLock<Vec<TradeRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed raw prices (stands in for the external ingester)
    pub fn push_prices(&self, points: impl IntoIterator<Item = RawPricePoint>) {
        self.prices.write().unwrap_or_else(PoisonError::into_inner).extend(points);
    }

    pub fn signals(&self) -> Vec<SignalDocument> {
        self.signals.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn trades(&self) -> Vec<TradeRecord> {
        self.trades.read().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

#[async_trait]
impl PriceStore for MemoryStore {
    async fn recent(&self, instrument: &str, limit: usize) -> Result<Vec<RawPricePoint>> {
        let matching: Vec<RawPricePoint> = self
            .prices
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|p| p.instrument == instrument)
            .cloned()
            .collect();
        Ok(newest_first(matching, limit, |p| p.timestamp))
    }
}

#[async_trait]
impl SignalStore for MemoryStore {
    async fn insert(&self, signal: &SignalDocument) -> Result<()> {
        self.signals.write().unwrap_or_else(PoisonError::into_inner).push(signal.clone());
        Ok(())
    }

    async fn latest(&self, instrument: &str) -> Result<Option<SignalDocument>> {
        Ok(SignalStore::recent(self, Some(instrument), 1).await?.into_iter().next())
    }

    async fn recent(&self, instrument: Option<&str>, limit: usize) -> Result<Vec<SignalDocument>> {
        let matching: Vec<SignalDocument> = self
            .signals
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|s| instrument.map_or(true, |i| s.instrument == i))
            .cloned()
            .collect();
        Ok(newest_first(matching, limit, |s| s.timestamp))
    }
}

#[async_trait]
impl TradeStore for MemoryStore {
    async fn insert(&self, trade: &TradeRecord) -> Result<()> {
        self.trades.write().unwrap_or_else(PoisonError::into_inner).push(trade.clone());
        Ok(())
    }

    async fn recent(&self, instrument: Option<&str>, limit: usize) -> Result<Vec<TradeRecord>> {
        let matching: Vec<TradeRecord> = self
            .trades
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|t| instrument.map_or(true, |i| t.instrument == i))
            .cloned()
            .collect();
        Ok(newest_first(matching, limit, |t| t.executed_at))
    }
}
