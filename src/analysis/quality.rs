//! Rolling quality estimates over emitted bytes.
//!
//! These are sanity checks to spot an obviously broken pipeline, not
//! proofs of entropy. They never gate output.

use super::history::EntropyHistory;
use serde::Serialize;

/// Statistics over the recorded history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityMetrics {
    /// Number of bytes analyzed.
    pub sample_size: usize,
    /// Arithmetic mean of byte values (127.5 for uniform bytes).
    pub mean: f64,
    /// Population standard deviation of byte values.
    pub std: f64,
    /// Distinct byte values divided by 256.
    pub entropy_estimate: f64,
    /// Number of distinct byte values.
    pub unique_bytes: usize,
    /// Lag-1 Pearson correlation between successive bytes.
    ///
    /// NaN when the history has no variance (correlation is undefined).
    pub serial_correlation: f64,
    /// Samples waiting in the collector queue.
    pub queue_size: usize,
}

/// Result of a quality request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum QualityReport {
    /// Too little history for meaningful statistics.
    InsufficientData {
        /// Bytes recorded so far.
        sample_size: usize,
    },
    /// Statistics over the current history.
    Measured(QualityMetrics),
}

impl QualityReport {
    /// Returns the metrics, if there was enough data.
    pub fn metrics(&self) -> Option<&QualityMetrics> {
        match self {
            QualityReport::Measured(metrics) => Some(metrics),
            QualityReport::InsufficientData { .. } => None,
        }
    }
}

/// Records emitted bytes and computes quality metrics on demand.
#[derive(Debug, Clone)]
pub struct QualityMonitor {
    history: EntropyHistory,
    min_history: usize,
}

impl QualityMonitor {
    /// Creates a monitor keeping `capacity` bytes and reporting once
    /// `min_history` bytes are available.
    pub fn new(capacity: usize, min_history: usize) -> Self {
        Self {
            history: EntropyHistory::new(capacity),
            min_history: min_history.max(1),
        }
    }

    /// Appends bytes contributed by one output.
    pub fn record(&mut self, bytes: &[u8]) {
        self.history.extend(bytes);
    }

    /// Bytes currently recorded.
    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Computes metrics over the history.
    ///
    /// `queue_size` is reported as-is; it comes from the collector.
    pub fn report(&self, queue_size: usize) -> QualityReport {
        if self.history.len() < self.min_history {
            return QualityReport::InsufficientData {
                sample_size: self.history.len(),
            };
        }

        let data = self.history.to_vec();
        let (mean, std) = mean_std(&data);
        let unique_bytes = unique_count(&data);

        QualityReport::Measured(QualityMetrics {
            sample_size: data.len(),
            mean,
            std,
            entropy_estimate: unique_bytes as f64 / 256.0,
            unique_bytes,
            serial_correlation: serial_correlation(&data),
            queue_size,
        })
    }
}

impl Default for QualityMonitor {
    fn default() -> Self {
        Self::new(10_000, 100)
    }
}

/// Mean and population standard deviation.
fn mean_std(data: &[u8]) -> (f64, f64) {
    if data.is_empty() {
        return (0.0, 0.0);
    }
    let n = data.len() as f64;
    let mean = data.iter().map(|&b| f64::from(b)).sum::<f64>() / n;
    let variance = data
        .iter()
        .map(|&b| (f64::from(b) - mean).powi(2))
        .sum::<f64>()
        / n;
    (mean, variance.sqrt())
}

fn unique_count(data: &[u8]) -> usize {
    let mut seen = [false; 256];
    for &b in data {
        seen[b as usize] = true;
    }
    seen.iter().filter(|&&s| s).count()
}

/// Pearson correlation between `data[..n-1]` and `data[1..]`.
///
/// Undefined (NaN) for a series without variance.
fn serial_correlation(data: &[u8]) -> f64 {
    if data.len() < 2 {
        return 0.0;
    }

    let x = &data[..data.len() - 1];
    let y = &data[1..];
    let n = x.len() as f64;
    let mean_x = x.iter().map(|&b| f64::from(b)).sum::<f64>() / n;
    let mean_y = y.iter().map(|&b| f64::from(b)).sum::<f64>() / n;

    let (mut cov, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for (&a, &b) in x.iter().zip(y) {
        let dx = f64::from(a) - mean_x;
        let dy = f64::from(b) - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    let denominator = (var_x * var_y).sqrt();
    if denominator == 0.0 {
        return f64::NAN;
    }
    cov / denominator
}
