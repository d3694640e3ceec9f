//! Resampler - irregular ticks into a fixed-interval bar series
//!
//! Each bar carries the last parseable observation of its bucket, keeping
//! that observation's own timestamp. Empty buckets are omitted, never
//! synthesized.

use chrono::{DateTime, Duration, Utc};

use crate::error::{PipelineError, PipelineResult};
use crate::types::{RawPricePoint, ResampledBar};

/// Fixed-interval "last observation per bucket" resampler
#[derive(Debug, Clone)]
pub struct Resampler {
    interval: Duration,
    min_raw_points: usize,
    min_bars: usize,
}

impl Resampler {
    pub fn new(interval: Duration, min_raw_points: usize, min_bars: usize) -> Self {
        Self {
            interval,
            min_raw_points,
            min_bars,
        }
    }

    /// Resample raw points of one instrument.
    ///
    /// Fails with `InsufficientData` when fewer than `min_raw_points` points
    /// are supplied or fewer than `min_bars` bars come out.
    pub fn resample(
        &self,
        instrument: &str,
        points: &[RawPricePoint],
    ) -> PipelineResult<Vec<ResampledBar>> {
        if points.len() < self.min_raw_points {
            return Err(PipelineError::InsufficientData {
                instrument: instrument.to_string(),
                stage: "raw points",
                available: points.len(),
                required: self.min_raw_points,
            });
        }

        let mut ordered: Vec<&RawPricePoint> = points.iter().collect();
        ordered.sort_by_key(|p| p.timestamp);

        let mut bars: Vec<ResampledBar> = Vec::new();
        let mut current_bucket: Option<i64> = None;

        for point in ordered {
            // Unparseable prices never reach a bucket
            let Some(price) = point.parsed_price() else {
                tracing::debug!(
                    instrument = %instrument,
                    timestamp = %point.timestamp,
                    raw = %point.price,
                    "Discarding unparseable price"
                );
                continue;
            };

            let bucket = self.bucket_index(point.timestamp);
            let bar = ResampledBar {
                instrument: instrument.to_string(),
                timestamp: point.timestamp,
                price,
            };

            match bars.last_mut() {
                Some(last) if current_bucket == Some(bucket) => *last = bar,
                _ => bars.push(bar),
            }
            current_bucket = Some(bucket);
        }

        if bars.len() < self.min_bars {
            return Err(PipelineError::InsufficientData {
                instrument: instrument.to_string(),
                stage: "resampled bars",
                available: bars.len(),
                required: self.min_bars,
            });
        }

        Ok(bars)
    }

    /// Epoch-aligned bucket number of a timestamp
    fn bucket_index(&self, ts: DateTime<Utc>) -> i64 {
        let width = self.interval.num_milliseconds().max(1);
        ts.timestamp_millis().div_euclid(width)
    }
}

impl Default for Resampler {
    fn default() -> Self {
        Self::new(Duration::minutes(5), 15, 15)
    }
}
