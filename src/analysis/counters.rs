//! Running counters shared between the generator and its collector.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Lock-free event counters.
#[derive(Debug, Default)]
pub struct HarvestCounters {
    outputs: AtomicU64,
    fallback_reads: AtomicU64,
    device_errors: AtomicU64,
    samples_collected: AtomicU64,
    samples_dropped: AtomicU64,
    collector_errors: AtomicU64,
}

impl HarvestCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_output(&self) {
        self.outputs.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fallback(&self) {
        self.fallback_reads.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_device_error(&self) {
        self.device_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_collected(&self) {
        self.samples_collected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped(&self) {
        self.samples_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_collector_error(&self) {
        self.collector_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy of every counter.
    pub fn snapshot(&self) -> GeneratorStats {
        GeneratorStats {
            outputs: self.outputs.load(Ordering::Relaxed),
            fallback_reads: self.fallback_reads.load(Ordering::Relaxed),
            device_errors: self.device_errors.load(Ordering::Relaxed),
            samples_collected: self.samples_collected.load(Ordering::Relaxed),
            samples_dropped: self.samples_dropped.load(Ordering::Relaxed),
            collector_errors: self.collector_errors.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of generator activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GeneratorStats {
    /// Values emitted by `next`.
    pub outputs: u64,
    /// Fresh samples replaced by a system-entropy read.
    pub fallback_reads: u64,
    /// Device read failures seen by callers of `next`.
    pub device_errors: u64,
    /// Samples extracted by the background collector.
    pub samples_collected: u64,
    /// Collected samples dropped because the queue was full.
    pub samples_dropped: u64,
    /// Failed collector iterations.
    pub collector_errors: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_reflects_events() {
        let counters = HarvestCounters::new();
        counters.record_output();
        counters.record_output();
        counters.record_dropped();
        counters.record_fallback();

        let stats = counters.snapshot();
        assert_eq!(stats.outputs, 2);
        assert_eq!(stats.samples_dropped, 1);
        assert_eq!(stats.fallback_reads, 1);
        assert_eq!(stats.device_errors, 0);
    }
}
