//! Signal publisher - one insert per successful instrument pass
//!
//! No upsert or dedup: re-running over the same data appends another
//! document with the same content and a new id.

use std::sync::Arc;

use crate::error::{PipelineError, PipelineResult};
use crate::store::SignalStore;
use crate::types::SignalDocument;

#[derive(Clone)]
pub struct SignalPublisher {
    store: Arc<dyn SignalStore>,
}

impl SignalPublisher {
    pub fn new(store: Arc<dyn SignalStore>) -> Self {
        Self { store }
    }

    pub async fn publish(&self, signal: &SignalDocument) -> PipelineResult<()> {
        self.store.insert(signal).await.map_err(PipelineError::Store)
    }
}
