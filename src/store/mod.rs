//! Document stores for prices, signals and trades
//!
//! Storage is treated as an append-only document log with
//! find/sort/limit/insert primitives. Two backends:
//! - [`CsvStore`]: daily CSV files under the data directory
//! - [`MemoryStore`]: in-process, used by tests and dry runs

pub mod csv;
pub mod memory;

pub use self::csv::CsvStore;
pub use self::memory::MemoryStore;

use anyhow::Result;
use async_trait::async_trait;

use crate::types::{RawPricePoint, SignalDocument, TradeRecord};

/// Read side of the raw price feed (populated by an external ingester)
#[async_trait]
pub trait PriceStore: Send + Sync {
    /// Most recent `limit` points for an instrument, newest first
    async fn recent(&self, instrument: &str, limit: usize) -> Result<Vec<RawPricePoint>>;
}

#[async_trait]
pub trait SignalStore: Send + Sync {
    /// Append one signal document
    async fn insert(&self, signal: &SignalDocument) -> Result<()>;

    /// Most recent signal for an instrument by timestamp
    async fn latest(&self, instrument: &str) -> Result<Option<SignalDocument>>;

    /// Recent signals, newest first, optionally filtered by instrument
    async fn recent(&self, instrument: Option<&str>, limit: usize) -> Result<Vec<SignalDocument>>;
}

#[async_trait]
pub trait TradeStore: Send + Sync {
    /// Append one trade record
    async fn insert(&self, trade: &TradeRecord) -> Result<()>;

    /// Recent trades by execution time, newest first, optionally filtered by instrument
    async fn recent(&self, instrument: Option<&str>, limit: usize) -> Result<Vec<TradeRecord>>;
}

/// Sort newest first and keep `limit` items
pub(crate) fn newest_first<T, F>(mut items: Vec<T>, limit: usize, key: F) -> Vec<T>
where
    F: Fn(&T) -> chrono::DateTime<chrono::Utc>,
{
    // Stable sort keeps insertion order between equal timestamps; reverse it so
    // the later insert wins ties.
    items.reverse();
    items.sort_by(|a, b| key(b).cmp(&key(a)));
    items.truncate(limit);
    items
}
