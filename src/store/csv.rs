//! CSV-backed document store
//!
//! Layout under the data directory:
//! - `prices/*.csv`  written by the external ingester (`instrument,timestamp,price`)
//! - `signals/signals_YYYY-MM-DD.csv`  appended by the signal publisher
//! - `trades/trades_YYYY-MM-DD.csv`  appended by the trade executor
//!
//! Every insert appends one row and flushes before returning. Reads skip
//! rows that fail to parse, so a torn append only loses that one row.

use ::csv::{ReaderBuilder, WriterBuilder};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::warn;

use super::{newest_first, PriceStore, SignalStore, TradeStore};
use crate::types::{RawPricePoint, SignalDocument, TradeRecord};

const PRICES_DIR: &str = "prices";
const SIGNALS_DIR: &str = "signals";
const TRADES_DIR: &str = "trades";

/// CSV persistence manager
pub struct CsvStore {
    data_dir: PathBuf,
    signal_lock: Mutex<()>,
    trade_lock: Mutex<()>,
}

impl CsvStore {
    /// Create the store, making sure the collection directories exist
    pub fn new(data_dir: &str) -> Result<Self> {
        let data_dir = PathBuf::from(data_dir);

        fs::create_dir_all(&data_dir).context("Failed to create data directory")?;
        for folder in [PRICES_DIR, SIGNALS_DIR, TRADES_DIR] {
            fs::create_dir_all(data_dir.join(folder))
                .with_context(|| format!("Failed ensuring {} exists", folder))?;
        }

        Ok(Self {
            data_dir,
            signal_lock: Mutex::new(()),
            trade_lock: Mutex::new(()),
        })
    }

    fn daily_path(&self, folder: &str) -> PathBuf {
        let today = Utc::now().format("%Y-%m-%d");
        self.data_dir
            .join(folder)
            .join(format!("{}_{}.csv", folder, today))
    }

    fn append_row<T: Serialize>(path: &Path, record: &T) -> Result<()> {
        let file_has_data =
            path.exists() && fs::metadata(path).map(|m| m.len() > 0).unwrap_or(false);

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open CSV file {}", path.display()))?;

        // Start on a fresh line if an earlier append was cut short
        if file_has_data && !ends_with_newline(&mut file)? {
            file.write_all(b"\n")
                .with_context(|| format!("Failed to terminate torn row in {}", path.display()))?;
        }

        let mut writer = WriterBuilder::new()
            .has_headers(!file_has_data)
            .from_writer(file);
        writer
            .serialize(record)
            .with_context(|| format!("Failed to write record to {}", path.display()))?;
        writer
            .flush()
            .with_context(|| format!("Failed to flush {}", path.display()))?;
        Ok(())
    }

    /// CSV files of a collection, oldest file first
    fn collection_files(&self, folder: &str) -> Result<Vec<PathBuf>> {
        let dir = self.data_dir.join(folder);
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut files: Vec<PathBuf> = fs::read_dir(&dir)
            .with_context(|| format!("Failed reading {}", dir.display()))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| {
                p.is_file()
                    && p.extension()
                        .and_then(|e| e.to_str())
                        .map(|e| e.eq_ignore_ascii_case("csv"))
                        .unwrap_or(false)
            })
            .collect();
        files.sort();
        Ok(files)
    }

    /// Load every matching row of a collection. Malformed rows are logged
    /// and skipped.
    fn load_collection<T, F>(&self, folder: &str, keep: F) -> Result<Vec<T>>
    where
        T: DeserializeOwned,
        F: Fn(&T) -> bool,
    {
        let mut records = Vec::new();
        for path in self.collection_files(folder)? {
            let file = fs::File::open(&path)
                .with_context(|| format!("Failed to open {}", path.display()))?;
            let mut reader = ReaderBuilder::new().has_headers(true).from_reader(file);

            for (row, result) in reader.deserialize::<T>().enumerate() {
                match result {
                    Ok(record) if keep(&record) => records.push(record),
                    Ok(_) => {}
                    Err(e) => {
                        warn!(
                            file = %path.display(),
                            row = row + 1,
                            error = %e,
                            "Skipping malformed row"
                        );
                    }
                }
            }
        }
        Ok(records)
    }
}

fn ends_with_newline(file: &mut fs::File) -> Result<bool> {
    file.seek(SeekFrom::End(-1))
        .context("Failed to seek to end of CSV file")?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)
        .context("Failed to read end of CSV file")?;
    Ok(last[0] == b'\n')
}

#[async_trait]
impl PriceStore for CsvStore {
    async fn recent(&self, instrument: &str, limit: usize) -> Result<Vec<RawPricePoint>> {
        let points: Vec<RawPricePoint> =
            self.load_collection(PRICES_DIR, |p: &RawPricePoint| p.instrument == instrument)?;
        Ok(newest_first(points, limit, |p| p.timestamp))
    }
}

#[async_trait]
impl SignalStore for CsvStore {
    async fn insert(&self, signal: &SignalDocument) -> Result<()> {
        let _guard = self.signal_lock.lock().await;
        Self::append_row(&self.daily_path(SIGNALS_DIR), signal)
            .context("Failed to write signal record")
    }

    async fn latest(&self, instrument: &str) -> Result<Option<SignalDocument>> {
        Ok(SignalStore::recent(self, Some(instrument), 1)
            .await?
            .into_iter()
            .next())
    }

    async fn recent(&self, instrument: Option<&str>, limit: usize) -> Result<Vec<SignalDocument>> {
        let signals: Vec<SignalDocument> =
            self.load_collection(SIGNALS_DIR, |s: &SignalDocument| {
                instrument.map_or(true, |i| s.instrument == i)
            })?;
        Ok(newest_first(signals, limit, |s| s.timestamp))
    }
}

#[async_trait]
impl TradeStore for CsvStore {
    async fn insert(&self, trade: &TradeRecord) -> Result<()> {
        let _guard = self.trade_lock.lock().await;
        Self::append_row(&self.daily_path(TRADES_DIR), trade).context("Failed to write trade record")
    }

    async fn recent(&self, instrument: Option<&str>, limit: usize) -> Result<Vec<TradeRecord>> {
        let trades: Vec<TradeRecord> = self.load_collection(TRADES_DIR, |t: &TradeRecord| {
            instrument.map_or(true, |i| t.instrument == i)
        })?;
        Ok(newest_first(trades, limit, |t| t.executed_at))
    }
}
