//! Prometheus metrics exporter for generator monitoring.
//!
//! # Metrics Exposed
//!
//! - `noise_trng_status` - Lifecycle state (0=unavailable, 1=initialized, 2=active, 3=stopped)
//! - `noise_trng_outputs_total` - Values emitted
//! - `noise_trng_fallback_reads_total` - Fresh samples replaced by system entropy
//! - `noise_trng_device_errors_total` - Device read failures while generating
//! - `noise_trng_samples_collected_total` / `noise_trng_samples_dropped_total` - Collector throughput
//! - `noise_trng_collector_errors_total` - Failed collector iterations
//! - `noise_trng_pool_size_bytes`, `noise_trng_queue_size`
//! - `noise_trng_byte_mean`, `noise_trng_byte_std`, `noise_trng_entropy_estimate`,
//!   `noise_trng_serial_correlation`, `noise_trng_quality_sample_size` - Latest quality report
//!
//! The HTTP server (`/metrics`, `/health`) is behind the `metrics` feature.
//!
//! # Example
//!
//! ```no_run
//! use noise_trng::metrics::{MetricsRegistry, MetricsSnapshot};
//! use noise_trng::{GeneratorConfig, TrueRandomGenerator};
//!
//! let generator = TrueRandomGenerator::fallback_only(GeneratorConfig::default()).unwrap();
//! let registry = MetricsRegistry::new().expect("Failed to create registry");
//!
//! registry.update(&MetricsSnapshot::from_generator(&generator));
//! println!("{}", registry.encode().unwrap());
//! ```

mod registry;
#[cfg(feature = "metrics")]
mod server;

pub use registry::{MetricsError, MetricsRegistry, MetricsSnapshot};
#[cfg(feature = "metrics")]
pub use server::{MetricsServer, MetricsServerConfig, ServerError};
