//! RsiBot Library
//!
//! RSI signal pipeline and trade automation for spot pairs

pub mod config;
pub mod error;
pub mod logging;
pub mod scheduler;
pub mod signal;
pub mod store;
pub mod trade;
pub mod types;

#[cfg(feature = "dashboard")]
pub mod dashboard;

pub use error::{PipelineError, PipelineResult};
