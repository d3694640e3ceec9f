//! Latest-signal resolver
//!
//! Always queries the store; nothing is cached between runs.

use std::sync::Arc;

use crate::error::{PipelineError, PipelineResult};
use crate::store::SignalStore;
use crate::types::SignalDocument;

#[derive(Clone)]
pub struct LatestSignalResolver {
    store: Arc<dyn SignalStore>,
}

impl LatestSignalResolver {
    pub fn new(store: Arc<dyn SignalStore>) -> Self {
        Self { store }
    }

    /// Most recent signal by timestamp, or `None` if nothing was published yet
    pub async fn resolve(&self, instrument: &str) -> PipelineResult<Option<SignalDocument>> {
        self.store.latest(instrument).await.map_err(PipelineError::Store)
    }
}
