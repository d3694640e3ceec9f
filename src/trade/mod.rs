//! Trade automation
//!
//! Per instrument: resolve the latest signal, then hand it to the executor.
//! Same isolation rules as the signal pipeline.

pub mod chain;
pub mod executor;
pub mod resolver;

pub use executor::{ContractBinding, OnchainExecution, TradeExecutor};
pub use resolver::LatestSignalResolver;

use anyhow::Result;
use async_trait::async_trait;
use tracing::{error, info};

use crate::error::PipelineResult;
use crate::scheduler::CycleJob;
use crate::types::TradeRecord;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TradeSummary {
    pub processed: usize,
    pub executed: usize,
    /// No signal yet, HOLD, or an unknown action code
    pub idle: usize,
    pub failed: usize,
}

pub struct TradeOrchestrator {
    instruments: Vec<String>,
    resolver: LatestSignalResolver,
    executor: TradeExecutor,
}

impl TradeOrchestrator {
    pub fn new(instruments: Vec<String>, resolver: LatestSignalResolver, executor: TradeExecutor) -> Self {
        Self {
            instruments,
            resolver,
            executor,
        }
    }

    pub async fn run_once(&self) -> TradeSummary {
        let mut summary = TradeSummary::default();

        for instrument in &self.instruments {
            summary.processed += 1;
            match self.process_instrument(instrument).await {
                Ok(Some(_)) => summary.executed += 1,
                Ok(None) => summary.idle += 1,
                Err(e) => {
                    summary.failed += 1;
                    error!(instrument = %instrument, error = %e, "Trade step failed");
                }
            }
        }

        info!(
            processed = summary.processed,
            executed = summary.executed,
            idle = summary.idle,
            failed = summary.failed,
            mode = %self.executor.mode(),
            "Trade run complete"
        );
        summary
    }

    pub async fn process_instrument(&self, instrument: &str) -> PipelineResult<Option<TradeRecord>> {
        let Some(signal) = self.resolver.resolve(instrument).await? else {
            info!(instrument = %instrument, "No signal yet, skipping");
            return Ok(None);
        };

        self.executor.execute_signal(&signal).await
    }
}

#[async_trait]
impl CycleJob for TradeOrchestrator {
    fn name(&self) -> &'static str {
        "trade-automation"
    }

    async fn run_cycle(&self) -> Result<()> {
        self.run_once().await;
        Ok(())
    }
}
