//! Output quality monitoring.
//!
//! This module keeps a bounded history of emitted bytes and computes
//! simple statistics over it, plus activity counters for the pipeline.
//! These are diagnostics, not cryptographic proofs of entropy.

mod counters;
mod history;
mod quality;

pub use counters::{GeneratorStats, HarvestCounters};
pub use history::EntropyHistory;
pub use quality::{QualityMetrics, QualityMonitor, QualityReport};
