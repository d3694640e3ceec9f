//! Error taxonomy for the signal and trade pipelines
//!
//! Per-instrument faults are contained by the orchestrators; only
//! orchestration faults escape a run and terminate the process.

use thiserror::Error;

use crate::trade::chain::ChainError;

#[derive(Error, Debug)]
pub enum PipelineError {
    /// Not enough raw points or resampled bars; the instrument is skipped.
    #[error("insufficient {stage} for {instrument}: have {available}, need {required}")]
    InsufficientData {
        instrument: String,
        stage: &'static str,
        available: usize,
        required: usize,
    },

    /// Query or insert against a store failed.
    #[error("store error: {0:#}")]
    Store(#[source] anyhow::Error),

    /// Signing, broadcast or contract-logic failure.
    #[error("chain submission failed: {0}")]
    Chain(#[from] ChainError),

    /// Missing credential or contract binding.
    #[error("configuration fault: {0}")]
    Configuration(String),
}

impl PipelineError {
    /// True for faults that are an expected SKIP rather than a failure.
    pub fn is_skip(&self) -> bool {
        matches!(self, PipelineError::InsufficientData { .. })
    }
}

pub type PipelineResult<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_insufficient_data_is_a_skip() {
        let skip = PipelineError::InsufficientData {
            instrument: "BTC/USDT".to_string(),
            stage: "raw points",
            available: 3,
            required: 15,
        };
        assert!(skip.is_skip());
        assert_eq!(
            skip.to_string(),
            "insufficient raw points for BTC/USDT: have 3, need 15"
        );

        let store = PipelineError::Store(anyhow::anyhow!("disk full"));
        assert!(!store.is_skip());
        assert!(!PipelineError::Chain(ChainError::Reverted("nope".into())).is_skip());
    }
}
