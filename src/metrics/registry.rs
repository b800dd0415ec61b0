//! Metrics collection and registry.

use crate::analysis::QualityReport;
use crate::generator::{GeneratorStatus, TrueRandomGenerator};
use crate::sync::lock;
use prometheus::{Encoder, Gauge, IntCounter, IntGauge, Registry, TextEncoder};
use std::sync::Mutex;
use thiserror::Error;

/// Errors that can occur during metrics operations.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
}

/// A snapshot of generator state for metrics update.
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    /// Lifecycle state.
    pub status: GeneratorStatus,
    /// Values emitted so far.
    pub outputs: u64,
    /// Fresh samples replaced by system entropy.
    pub fallback_reads: u64,
    /// Device read failures seen while generating.
    pub device_errors: u64,
    /// Samples extracted by the collector.
    pub samples_collected: u64,
    /// Samples dropped on a full queue.
    pub samples_dropped: u64,
    /// Failed collector iterations.
    pub collector_errors: u64,
    /// Entropy pool size in bytes.
    pub pool_size_bytes: usize,
    /// Samples waiting in the collector queue.
    pub queue_size: usize,
    /// Bytes analyzed by the last quality report (0 if insufficient).
    pub quality_sample_size: usize,
    /// Mean byte value, when measured.
    pub mean: Option<f64>,
    /// Byte standard deviation, when measured.
    pub std: Option<f64>,
    /// Unique-byte entropy estimate, when measured.
    pub entropy_estimate: Option<f64>,
    /// Lag-1 serial correlation, when measured.
    pub serial_correlation: Option<f64>,
}

impl Default for MetricsSnapshot {
    fn default() -> Self {
        Self {
            status: GeneratorStatus::Unavailable,
            outputs: 0,
            fallback_reads: 0,
            device_errors: 0,
            samples_collected: 0,
            samples_dropped: 0,
            collector_errors: 0,
            pool_size_bytes: 0,
            queue_size: 0,
            quality_sample_size: 0,
            mean: None,
            std: None,
            entropy_estimate: None,
            serial_correlation: None,
        }
    }
}

impl MetricsSnapshot {
    /// Captures the current state of a generator.
    pub fn from_generator(generator: &TrueRandomGenerator) -> Self {
        let stats = generator.stats();
        let mut snapshot = Self {
            status: generator.status(),
            outputs: stats.outputs,
            fallback_reads: stats.fallback_reads,
            device_errors: stats.device_errors,
            samples_collected: stats.samples_collected,
            samples_dropped: stats.samples_dropped,
            collector_errors: stats.collector_errors,
            pool_size_bytes: generator.entropy_estimate(),
            queue_size: generator.queue_len(),
            ..Default::default()
        };

        snapshot.apply_quality(&generator.quality_metrics());
        snapshot
    }

    /// Copies the measured quality fields; undefined statistics are skipped.
    fn apply_quality(&mut self, report: &QualityReport) {
        if let QualityReport::Measured(metrics) = report {
            self.quality_sample_size = metrics.sample_size;
            self.mean = Some(metrics.mean);
            self.std = Some(metrics.std);
            self.entropy_estimate = Some(metrics.entropy_estimate);
            self.serial_correlation = Some(metrics.serial_correlation).filter(|c| c.is_finite());
        }
    }
}

/// Prometheus metrics registry for generator monitoring.
pub struct MetricsRegistry {
    registry: Registry,
    /// Serializes updates so counter differences are applied once.
    update_lock: Mutex<()>,

    // Lifecycle
    status: IntGauge,

    // Activity counters
    outputs_total: IntCounter,
    fallback_reads_total: IntCounter,
    device_errors_total: IntCounter,
    samples_collected_total: IntCounter,
    samples_dropped_total: IntCounter,
    collector_errors_total: IntCounter,

    // Pool and queue
    pool_size_bytes: IntGauge,
    queue_size: IntGauge,

    // Quality
    quality_sample_size: IntGauge,
    byte_mean: Gauge,
    byte_std: Gauge,
    entropy_estimate: Gauge,
    serial_correlation: Gauge,
}

impl MetricsRegistry {
    /// Creates a registry with every generator metric registered.
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let status = IntGauge::new(
            "noise_trng_status",
            "Generator status (0=unavailable, 1=initialized, 2=active, 3=stopped)",
        )?;

        let outputs_total = IntCounter::new("noise_trng_outputs_total", "Values emitted")?;
        let fallback_reads_total = IntCounter::new(
            "noise_trng_fallback_reads_total",
            "Fresh samples replaced by system entropy",
        )?;
        let device_errors_total = IntCounter::new(
            "noise_trng_device_errors_total",
            "Device read failures while generating",
        )?;
        let samples_collected_total = IntCounter::new(
            "noise_trng_samples_collected_total",
            "Samples extracted by the background collector",
        )?;
        let samples_dropped_total = IntCounter::new(
            "noise_trng_samples_dropped_total",
            "Collected samples dropped because the queue was full",
        )?;
        let collector_errors_total = IntCounter::new(
            "noise_trng_collector_errors_total",
            "Failed collector iterations",
        )?;

        let pool_size_bytes =
            IntGauge::new("noise_trng_pool_size_bytes", "Entropy pool size in bytes")?;
        let queue_size = IntGauge::new("noise_trng_queue_size", "Samples waiting in the queue")?;

        let quality_sample_size = IntGauge::new(
            "noise_trng_quality_sample_size",
            "Bytes analyzed by the latest quality report",
        )?;
        let byte_mean = Gauge::new("noise_trng_byte_mean", "Mean of recorded byte values")?;
        let byte_std = Gauge::new(
            "noise_trng_byte_std",
            "Standard deviation of recorded byte values",
        )?;
        let entropy_estimate = Gauge::new(
            "noise_trng_entropy_estimate",
            "Distinct byte values divided by 256",
        )?;
        let serial_correlation = Gauge::new(
            "noise_trng_serial_correlation",
            "Lag-1 correlation of recorded bytes",
        )?;

        registry.register(Box::new(status.clone()))?;
        registry.register(Box::new(outputs_total.clone()))?;
        registry.register(Box::new(fallback_reads_total.clone()))?;
        registry.register(Box::new(device_errors_total.clone()))?;
        registry.register(Box::new(samples_collected_total.clone()))?;
        registry.register(Box::new(samples_dropped_total.clone()))?;
        registry.register(Box::new(collector_errors_total.clone()))?;
        registry.register(Box::new(pool_size_bytes.clone()))?;
        registry.register(Box::new(queue_size.clone()))?;
        registry.register(Box::new(quality_sample_size.clone()))?;
        registry.register(Box::new(byte_mean.clone()))?;
        registry.register(Box::new(byte_std.clone()))?;
        registry.register(Box::new(entropy_estimate.clone()))?;
        registry.register(Box::new(serial_correlation.clone()))?;

        Ok(Self {
            registry,
            update_lock: Mutex::new(()),
            status,
            outputs_total,
            fallback_reads_total,
            device_errors_total,
            samples_collected_total,
            samples_dropped_total,
            collector_errors_total,
            pool_size_bytes,
            queue_size,
            quality_sample_size,
            byte_mean,
            byte_std,
            entropy_estimate,
            serial_correlation,
        })
    }

    /// Updates all metrics from a snapshot.
    pub fn update(&self, snapshot: &MetricsSnapshot) {
        let _guard = lock(&self.update_lock);
        self.status.set(snapshot.status.code());

        // Counters only move forward; add the difference.
        advance(&self.outputs_total, snapshot.outputs);
        advance(&self.fallback_reads_total, snapshot.fallback_reads);
        advance(&self.device_errors_total, snapshot.device_errors);
        advance(&self.samples_collected_total, snapshot.samples_collected);
        advance(&self.samples_dropped_total, snapshot.samples_dropped);
        advance(&self.collector_errors_total, snapshot.collector_errors);

        self.pool_size_bytes.set(snapshot.pool_size_bytes as i64);
        self.queue_size.set(snapshot.queue_size as i64);
        self.quality_sample_size.set(snapshot.quality_sample_size as i64);

        if let Some(mean) = snapshot.mean {
            self.byte_mean.set(mean);
        }
        if let Some(std) = snapshot.std {
            self.byte_std.set(std);
        }
        if let Some(estimate) = snapshot.entropy_estimate {
            self.entropy_estimate.set(estimate);
        }
        if let Some(correlation) = snapshot.serial_correlation {
            self.serial_correlation.set(correlation);
        }
    }

    /// Returns the underlying Prometheus registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Encodes all metrics in Prometheus text format.
    pub fn encode(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

fn advance(counter: &IntCounter, total: u64) {
    let current = counter.get();
    if total > current {
        counter.inc_by(total - current);
    }
}

impl std::fmt::Debug for MetricsRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsRegistry")
            .field("outputs_total", &self.outputs_total.get())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::QualityMetrics;
    use crate::config::GeneratorConfig;

    #[test]
    fn test_registry_creation() {
        assert!(MetricsRegistry::new().is_ok());
    }

    #[test]
    fn test_counters_advance_by_difference() {
        let registry = MetricsRegistry::new().unwrap();

        let mut snapshot = MetricsSnapshot {
            status: GeneratorStatus::Active,
            outputs: 10,
            samples_dropped: 2,
            pool_size_bytes: 24,
            ..Default::default()
        };
        registry.update(&snapshot);
        registry.update(&snapshot);

        snapshot.outputs = 15;
        registry.update(&snapshot);

        let output = registry.encode().unwrap();
        assert!(output.contains("noise_trng_status 2"));
        assert!(output.contains("noise_trng_outputs_total 15"));
        assert!(output.contains("noise_trng_samples_dropped_total 2"));
        assert!(output.contains("noise_trng_pool_size_bytes 24"));
    }

    #[test]
    fn test_concurrent_updates_count_once() {
        let registry = std::sync::Arc::new(MetricsRegistry::new().unwrap());
        let snapshot = MetricsSnapshot {
            outputs: 1000,
            ..Default::default()
        };

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = std::sync::Arc::clone(&registry);
                let snapshot = snapshot.clone();
                std::thread::spawn(move || {
                    for _ in 0..200 {
                        registry.update(&snapshot);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert!(registry.encode().unwrap().contains("noise_trng_outputs_total 1000\n"));
    }

    #[test]
    fn test_undefined_correlation_not_exported() {
        let metrics = QualityMetrics {
            sample_size: 200,
            mean: 128.0,
            std: 0.0,
            entropy_estimate: 1.0 / 256.0,
            unique_bytes: 1,
            serial_correlation: f64::NAN,
            queue_size: 0,
        };
        let mut snapshot = MetricsSnapshot::default();
        snapshot.apply_quality(&QualityReport::Measured(metrics));

        assert_eq!(snapshot.quality_sample_size, 200);
        assert_eq!(snapshot.std, Some(0.0));
        assert_eq!(snapshot.serial_correlation, None);

        let registry = MetricsRegistry::new().unwrap();
        registry.update(&snapshot);
        assert!(registry.encode().unwrap().contains("noise_trng_serial_correlation 0\n"));
    }

    #[test]
    fn test_snapshot_from_generator() {
        let generator = TrueRandomGenerator::fallback_only(GeneratorConfig::default()).unwrap();
        let early = MetricsSnapshot::from_generator(&generator);
        assert_eq!(early.mean, None);

        generator.generate_sequence(30);
        let snapshot = MetricsSnapshot::from_generator(&generator);
        assert_eq!(snapshot.status, GeneratorStatus::Unavailable);
        assert_eq!(snapshot.outputs, 30);
        assert_eq!(snapshot.fallback_reads, 30);
        assert_eq!(snapshot.pool_size_bytes, 24);
        assert_eq!(snapshot.quality_sample_size, 120);
        assert!(snapshot.mean.is_some());

        let registry = MetricsRegistry::new().unwrap();
        registry.update(&snapshot);
        assert!(registry.encode().unwrap().contains("noise_trng_quality_sample_size 120"));
    }
}
