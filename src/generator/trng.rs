//! The true random number generator.
//!
//! Every call to [`TrueRandomGenerator::next_u32`] conditions the current
//! pool together with everything the collector queued since the last
//! call, one fresh sample taken on the caller's thread and (optionally)
//! supplementary system material. The pool is replaced by the
//! conditioner's output on every call.

use super::capability::{normalize, RandomSource};
use super::lifecycle::{GeneratorStatus, Lifecycle};
use super::GeneratorError;
use crate::analysis::{GeneratorStats, HarvestCounters, QualityMonitor, QualityReport};
use crate::conditioning::{Conditioner, EntropyPool, SeedMaterial};
use crate::config::{CollectorConfig, FileConfig, GeneratorConfig, HistoryMode, SourceConfig};
use crate::extraction::{supplementary_material, EntropySample, FeatureExtractor, NoiseExtractor};
use crate::source::{self, system_entropy, NoiseError, NoiseSource, SharedSource, SourceBackend};
use crate::sync::lock;
use std::sync::{Arc, Mutex};

/// Material bytes recorded per call in [`HistoryMode::Material`].
const MATERIAL_HISTORY_BYTES: usize = 100;

/// State mutated by every output.
struct GeneratorState {
    pool: EntropyPool,
    monitor: QualityMonitor,
}

/// Ambient-noise true random number generator.
///
/// All operations take `&self`; share it across threads with `Arc`.
/// Calls to `next_u32` are serialized internally.
pub struct TrueRandomGenerator {
    config: GeneratorConfig,
    n_samples: usize,
    state: Mutex<GeneratorState>,
    lifecycle: Lifecycle,
    extractor: Arc<dyn FeatureExtractor>,
    counters: Arc<HarvestCounters>,
    conditioner: Conditioner,
}

impl TrueRandomGenerator {
    /// Starts building a generator.
    pub fn builder() -> GeneratorBuilder {
        GeneratorBuilder::default()
    }

    /// Opens a generator that never touches a noise device.
    pub fn fallback_only(config: GeneratorConfig) -> Result<Self, GeneratorError> {
        Self::builder()
            .source_config(SourceConfig::for_backend(SourceBackend::Fallback))
            .config(config)
            .open()
    }

    /// Opens a generator as described by a configuration file.
    pub fn from_file_config(file: &FileConfig) -> Result<Self, GeneratorError> {
        Self::builder()
            .source_config(file.source.clone())
            .collector_config(file.collector.clone())
            .config(file.generator.clone())
            .open()
    }

    /// Produces the next 32-bit value.
    ///
    /// Never fails: device trouble is replaced by system entropy.
    pub fn next_u32(&self) -> u32 {
        let mut state = lock(&self.state);

        let material = self.gather_material();
        let (output, pool) = self
            .conditioner
            .condition(&state.pool, &material)
            .into_parts();
        state.pool = pool;

        match self.config.history_mode {
            HistoryMode::Output => state.monitor.record(&output.to_be_bytes()),
            HistoryMode::Material => {
                let recorded = material.len().min(MATERIAL_HISTORY_BYTES);
                state.monitor.record(&material[..recorded]);
            }
        }

        self.counters.record_output();
        output
    }

    /// Next value mapped into `[0, 1)`.
    pub fn normalized_next(&self) -> f64 {
        normalize(self.next_u32())
    }

    /// `n` successive values.
    pub fn generate_sequence(&self, n: usize) -> Vec<u32> {
        (0..n).map(|_| self.next_u32()).collect()
    }

    /// `n` successive values mapped into `[0, 1)`.
    pub fn normalized_sequence(&self, n: usize) -> Vec<f64> {
        (0..n).map(|_| self.normalized_next()).collect()
    }

    /// Pool length in bytes.
    pub fn entropy_estimate(&self) -> usize {
        lock(&self.state).pool.len()
    }

    /// Quality statistics over the recorded history.
    pub fn quality_metrics(&self) -> QualityReport {
        let state = lock(&self.state);
        state.monitor.report(self.lifecycle.queue_len())
    }

    /// Samples waiting in the collector queue.
    pub fn queue_len(&self) -> usize {
        self.lifecycle.queue_len()
    }

    /// Current lifecycle state.
    pub fn status(&self) -> GeneratorStatus {
        self.lifecycle.status()
    }

    /// Backend name and status, e.g. `microphone (active)`.
    pub fn describe(&self) -> String {
        format!("{} ({})", self.lifecycle.backend(), self.status())
    }

    /// Mixes freshly gathered seed material into the pool.
    pub fn refresh(&self) {
        let mut state = lock(&self.state);
        let sample = self.device_sample();
        let material = SeedMaterial::gather(sample.as_ref().map(EntropySample::data));
        state.pool = state.pool.refreshed(&material);
        tracing::info!(with_device = sample.is_some(), "Entropy pool refreshed");
    }

    /// Stops collection and releases the device. Idempotent.
    ///
    /// The generator keeps working afterwards on system entropy.
    pub fn close(&self) {
        self.lifecycle.close();
    }

    /// Activity counters.
    pub fn stats(&self) -> GeneratorStats {
        self.counters.snapshot()
    }

    /// Queued samples, one fresh sample and supplementary material.
    fn gather_material(&self) -> Vec<u8> {
        let mut material = Vec::new();
        for sample in self.lifecycle.drain_queue() {
            material.extend(sample.into_bytes());
        }

        let fresh = self.device_sample().unwrap_or_else(|| {
            self.counters.record_fallback();
            EntropySample::fallback(system_entropy(self.config.fallback_bytes))
        });
        material.extend(fresh.into_bytes());

        if self.config.supplementary_sources {
            material.extend(supplementary_material());
        }
        material
    }

    /// One extracted sample from the device, if it is open and readable.
    fn device_sample(&self) -> Option<EntropySample> {
        let device = self.lifecycle.device()?;
        match harvest(&device, self.extractor.as_ref(), self.n_samples) {
            Ok(sample) => Some(sample),
            Err(NoiseError::NotOpen) => None,
            Err(e) => {
                self.counters.record_device_error();
                tracing::warn!(error = %e, "Device read failed, using system entropy");
                None
            }
        }
    }
}

/// Reads one block and extracts it outside the device lock.
fn harvest(
    device: &SharedSource,
    extractor: &dyn FeatureExtractor,
    n_samples: usize,
) -> Result<EntropySample, NoiseError> {
    let block = {
        let mut source = lock(device);
        if !source.status().is_active() {
            return Err(NoiseError::NotOpen);
        }
        source.read(n_samples)?
    };
    Ok(extractor.extract(&block))
}

impl RandomSource for TrueRandomGenerator {
    fn next(&mut self) -> u32 {
        TrueRandomGenerator::next_u32(self)
    }
}

impl rand_core::RngCore for TrueRandomGenerator {
    fn next_u32(&mut self) -> u32 {
        TrueRandomGenerator::next_u32(self)
    }

    fn next_u64(&mut self) -> u64 {
        let high = u64::from(TrueRandomGenerator::next_u32(self));
        let low = u64::from(TrueRandomGenerator::next_u32(self));
        (high << 32) | low
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(4) {
            let bytes = TrueRandomGenerator::next_u32(self).to_be_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand_core::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

impl std::fmt::Debug for TrueRandomGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrueRandomGenerator")
            .field("lifecycle", &self.lifecycle)
            .field("history_mode", &self.config.history_mode)
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

/// Builder for [`TrueRandomGenerator`].
///
/// Without an explicit [`source`](Self::source) the backend named in the
/// source configuration is used.
#[derive(Default)]
pub struct GeneratorBuilder {
    source: Option<Box<dyn NoiseSource>>,
    source_config: SourceConfig,
    collector_config: CollectorConfig,
    config: GeneratorConfig,
    extractor: Option<Arc<dyn FeatureExtractor>>,
    initial_pool: Option<EntropyPool>,
}

impl GeneratorBuilder {
    /// Uses `source` instead of the configured backend.
    pub fn source(mut self, source: Box<dyn NoiseSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Device parameters and backend selection.
    pub fn source_config(mut self, config: SourceConfig) -> Self {
        self.source_config = config;
        self
    }

    /// Background collector pacing and queue size.
    pub fn collector_config(mut self, config: CollectorConfig) -> Self {
        self.collector_config = config;
        self
    }

    /// Generator behavior.
    pub fn config(mut self, config: GeneratorConfig) -> Self {
        self.config = config;
        self
    }

    /// Replaces the default [`NoiseExtractor`].
    pub fn extractor(mut self, extractor: Arc<dyn FeatureExtractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    /// Starts from a known pool instead of seeding one.
    ///
    /// Intended for reproducible tests.
    pub fn initial_pool(mut self, pool: EntropyPool) -> Self {
        self.initial_pool = Some(pool);
        self
    }

    /// Validates the configuration, opens the device and seeds the pool.
    ///
    /// Only invalid configuration is an error; an unusable device leaves
    /// the generator in fallback mode.
    pub fn open(self) -> Result<TrueRandomGenerator, GeneratorError> {
        self.source_config.validate()?;
        self.collector_config.validate()?;
        self.config.validate()?;

        let GeneratorBuilder {
            source,
            source_config,
            collector_config,
            config,
            extractor,
            initial_pool,
        } = self;

        let source = source.or_else(|| source::from_config(&source_config));
        let lifecycle = Lifecycle::open(source, &source_config);
        let extractor = extractor.unwrap_or_else(|| Arc::new(NoiseExtractor::new(config.features)));
        let counters = Arc::new(HarvestCounters::new());
        let n_samples = source_config.samples_per_read();

        let pool = match initial_pool {
            Some(pool) => pool,
            None => {
                let sample = lifecycle.device().and_then(|device| {
                    harvest(&device, extractor.as_ref(), n_samples)
                        .map_err(|e| tracing::warn!(error = %e, "Seeding read failed"))
                        .ok()
                });
                EntropyPool::seeded(&SeedMaterial::gather(sample.as_ref().map(EntropySample::data)))
            }
        };

        if config.collect_in_background {
            lifecycle.start_collector(
                Arc::clone(&extractor),
                &collector_config,
                n_samples,
                Arc::clone(&counters),
            );
        }

        let generator = TrueRandomGenerator {
            state: Mutex::new(GeneratorState {
                pool,
                monitor: QualityMonitor::new(config.history_capacity, config.min_history),
            }),
            config,
            n_samples,
            lifecycle,
            extractor,
            counters,
            conditioner: Conditioner::new(),
        };

        tracing::info!(
            source = %generator.describe(),
            samples_per_read = n_samples,
            "True random generator opened"
        );
        Ok(generator)
    }
}

impl std::fmt::Debug for GeneratorBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeneratorBuilder")
            .field("source", &self.source.as_ref().map(|s| s.name().to_string()))
            .field("source_config", &self.source_config)
            .field("collector_config", &self.collector_config)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
