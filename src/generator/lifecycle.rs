//! Open/close sequencing for the noise device and collector.
//!
//! Opening never fails: a device that cannot be opened leaves the
//! generator in fallback mode. Closing is idempotent, safe after a
//! partial open, and always releases the device handle.

use crate::analysis::HarvestCounters;
use crate::collector::{EntropyCollector, StopOutcome};
use crate::config::{CollectorConfig, SourceConfig};
use crate::extraction::{EntropySample, FeatureExtractor};
use crate::source::{NoiseSource, SharedSource, SourceStatus};
use crate::sync::{lock, try_lock};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

/// Externally visible generator state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratorStatus {
    /// No noise device; running on system entropy only.
    Unavailable,
    /// Device open, no background collection.
    Initialized,
    /// Device open and collector running.
    Active,
    /// Closed, or the device stopped delivering.
    Stopped,
}

impl GeneratorStatus {
    /// Stable numeric code for metrics export.
    pub fn code(self) -> i64 {
        match self {
            GeneratorStatus::Unavailable => 0,
            GeneratorStatus::Initialized => 1,
            GeneratorStatus::Active => 2,
            GeneratorStatus::Stopped => 3,
        }
    }
}

impl fmt::Display for GeneratorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            GeneratorStatus::Unavailable => "unavailable",
            GeneratorStatus::Initialized => "initialized",
            GeneratorStatus::Active => "active",
            GeneratorStatus::Stopped => "stopped",
        };
        f.write_str(text)
    }
}

/// Owns the device handle and the collector.
pub(crate) struct Lifecycle {
    device: Mutex<Option<SharedSource>>,
    collector: Mutex<Option<EntropyCollector>>,
    backend: String,
    closed: AtomicBool,
}

impl Lifecycle {
    /// Opens `source`, degrading to fallback mode on failure.
    pub fn open(source: Option<Box<dyn NoiseSource>>, config: &SourceConfig) -> Self {
        let mut backend = "fallback".to_string();
        let device = source.and_then(|mut source| {
            backend = source.name().to_string();
            match source.open(config) {
                Ok(()) => Some(Arc::new(Mutex::new(source))),
                Err(e) => {
                    tracing::warn!(
                        backend = %backend,
                        error = %e,
                        "Noise device unavailable, falling back to system entropy"
                    );
                    // Release anything a partial open acquired.
                    source.close();
                    None
                }
            }
        });

        Self {
            device: Mutex::new(device),
            collector: Mutex::new(None),
            backend,
            closed: AtomicBool::new(false),
        }
    }

    /// The shared device, if one is open.
    pub fn device(&self) -> Option<SharedSource> {
        lock(&self.device).clone()
    }

    /// Returns true while a device handle is held.
    pub fn has_device(&self) -> bool {
        lock(&self.device).is_some()
    }

    /// Name of the configured backend.
    pub fn backend(&self) -> &str {
        &self.backend
    }

    /// Starts background collection if a device is open.
    ///
    /// A failure to spawn the worker is logged and leaves the generator
    /// running without background collection.
    pub fn start_collector(
        &self,
        extractor: Arc<dyn FeatureExtractor>,
        config: &CollectorConfig,
        n_samples: usize,
        counters: Arc<HarvestCounters>,
    ) -> bool {
        let Some(device) = self.device() else {
            return false;
        };

        match EntropyCollector::spawn(device, extractor, config, n_samples, counters) {
            Ok(collector) => {
                *lock(&self.collector) = Some(collector);
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to start entropy collector");
                false
            }
        }
    }

    /// Takes every queued sample.
    pub fn drain_queue(&self) -> Vec<EntropySample> {
        lock(&self.collector)
            .as_ref()
            .map(|c| c.queue().drain())
            .unwrap_or_default()
    }

    /// Samples waiting in the queue (0 when not collecting).
    pub fn queue_len(&self) -> usize {
        lock(&self.collector)
            .as_ref()
            .map_or(0, |c| c.queue().len())
    }

    /// Current state, derived from the device and collector.
    pub fn status(&self) -> GeneratorStatus {
        if self.closed.load(Ordering::Acquire) {
            return GeneratorStatus::Stopped;
        }
        let Some(device) = self.device() else {
            return GeneratorStatus::Unavailable;
        };
        // A held device lock means a read is in flight.
        let device_status = try_lock(&device).map_or(SourceStatus::Active, |source| source.status());

        match device_status {
            SourceStatus::Unavailable => GeneratorStatus::Unavailable,
            SourceStatus::Stopped => GeneratorStatus::Stopped,
            SourceStatus::Active => {
                let collecting = lock(&self.collector)
                    .as_ref()
                    .is_some_and(EntropyCollector::is_running);
                if collecting {
                    GeneratorStatus::Active
                } else {
                    GeneratorStatus::Initialized
                }
            }
        }
    }

    /// Returns true once `close` has run.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Stops the collector and releases the device.
    ///
    /// Only the first call does anything.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            tracing::debug!("Generator already closed");
            return;
        }

        if let Some(mut collector) = lock(&self.collector).take() {
            match collector.stop() {
                StopOutcome::TimedOut => {
                    tracing::warn!("Collector join timed out, continuing teardown");
                }
                StopOutcome::Joined | StopOutcome::NotRunning => {}
            }
        }

        if let Some(device) = lock(&self.device).take() {
            release(device);
        }

        tracing::info!(backend = %self.backend, "Generator resources released");
    }
}

/// Closes the device, or hands the close to a helper thread when a read
/// still holds the device lock.
fn release(device: SharedSource) {
    if let Some(mut source) = try_lock(&device) {
        source.close();
        return;
    }

    tracing::warn!("Noise device busy, closing it once the pending read returns");
    let spawned = thread::Builder::new()
        .name("device-release".into())
        .spawn(move || lock(&device).close());
    if let Err(e) = spawned {
        tracing::warn!(error = %e, "Failed to spawn device release thread");
    }
}

impl Drop for Lifecycle {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lifecycle")
            .field("backend", &self.backend)
            .field("has_device", &self.has_device())
            .field("closed", &self.is_closed())
            .finish()
    }
}
