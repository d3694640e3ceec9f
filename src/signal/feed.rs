//! Feed reader - recent raw prices for one instrument

use std::sync::Arc;

use crate::error::{PipelineError, PipelineResult};
use crate::store::PriceStore;
use crate::types::RawPricePoint;

#[derive(Clone)]
pub struct FeedReader {
    store: Arc<dyn PriceStore>,
    limit: usize,
}

impl FeedReader {
    pub fn new(store: Arc<dyn PriceStore>, limit: usize) -> Self {
        Self { store, limit }
    }

    /// Most recent `limit` points, returned oldest first
    pub async fn fetch(&self, instrument: &str) -> PipelineResult<Vec<RawPricePoint>> {
        let mut points = self
            .store
            .recent(instrument, self.limit)
            .await
            .map_err(PipelineError::Store)?;
        points.reverse();
        Ok(points)
    }
}
