//! Continuous background entropy collection.
//!
//! A single worker thread per generator reads sample blocks, extracts
//! features and pushes the results into a bounded, lossy queue that the
//! generator drains on demand.

mod queue;
mod worker;

pub use queue::{sample_queue, Offer, SampleQueue, SampleSink};
pub use worker::{EntropyCollector, StopOutcome};
