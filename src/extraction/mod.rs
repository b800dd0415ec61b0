//! Feature extraction from raw noise samples.
//!
//! This module turns one block of raw samples into entropy bytes by
//! concatenating several independent features: debiased LSBs, the high
//! spectral band, second-order differences, timing jitter and a
//! timestamp. Each stage can be switched off through [`FeatureSet`].

mod debias;
mod difference;
mod jitter;
mod sample;
mod spectral;

pub use debias::{lsb_stream, von_neumann};
pub use difference::second_difference_bits;
pub use jitter::{allocation_timing, arithmetic_jitter, syscall_jitter, JITTER_SUBSAMPLES};
pub use sample::{EntropySample, SampleOrigin};
pub use spectral::{high_band_nibbles, MIN_SPECTRAL_SAMPLES};

use crate::source::{system_entropy, wall_clock_nanos, SampleBlock};
use serde::{Deserialize, Serialize};

/// Turns a raw sample block into entropy bytes.
///
/// Implementations are shared between the collector thread and callers
/// of the generator, hence `Send + Sync`.
pub trait FeatureExtractor: Send + Sync {
    /// Extracts entropy bytes from one block.
    fn extract(&self, block: &SampleBlock) -> EntropySample;
}

/// Enabled feature extraction stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureSet {
    /// Von Neumann debiased LSB stream.
    pub debias: bool,
    /// Low nibbles of the upper spectral half.
    pub spectral: bool,
    /// Low bits of second-order differences.
    pub difference: bool,
    /// Timing jitter of per-sample arithmetic.
    pub jitter: bool,
    /// Trailing 8-byte wall-clock timestamp.
    pub timestamp: bool,
}

impl Default for FeatureSet {
    fn default() -> Self {
        Self {
            debias: true,
            spectral: true,
            difference: true,
            jitter: true,
            timestamp: true,
        }
    }
}

/// Production extractor combining every enabled feature in order.
#[derive(Debug, Clone, Default)]
pub struct NoiseExtractor {
    features: FeatureSet,
}

impl NoiseExtractor {
    pub fn new(features: FeatureSet) -> Self {
        Self { features }
    }

    /// Returns the enabled stages.
    pub fn features(&self) -> FeatureSet {
        self.features
    }
}

impl FeatureExtractor for NoiseExtractor {
    fn extract(&self, block: &SampleBlock) -> EntropySample {
        let samples = block.samples();
        let mut data = Vec::with_capacity(samples.len() * 2 + 8);

        if self.features.debias {
            data.extend(von_neumann(&lsb_stream(samples)));
        }
        if self.features.spectral {
            data.extend(high_band_nibbles(samples));
        }
        if self.features.difference {
            data.extend(second_difference_bits(samples));
        }
        if self.features.jitter {
            data.extend(arithmetic_jitter(samples, JITTER_SUBSAMPLES));
        }
        if self.features.timestamp {
            data.extend_from_slice(&wall_clock_nanos().to_le_bytes());
        }

        tracing::trace!(
            samples = samples.len(),
            bytes = data.len(),
            sequence = block.sequence(),
            "Extracted features from block"
        );

        EntropySample::new(data, SampleOrigin::Device, block.sequence())
    }
}

/// Per-call material mixed in alongside the sampled entropy.
///
/// 16 bytes of system entropy, the low bytes of 20 timed process-id
/// lookups and the duration of a small allocation.
pub fn supplementary_material() -> Vec<u8> {
    let mut material = system_entropy(16);
    material.extend(syscall_jitter(20));
    material.extend_from_slice(&allocation_timing());
    material
}
