//! Deterministic simulated noise device.

use super::noise::{NoiseError, NoiseSource, SampleBlock, SourceStatus};
use crate::config::SourceConfig;
use rand_chacha::ChaCha20Rng;
use rand_core::{RngCore, SeedableRng};

/// Simulated microphone producing seeded pseudo-noise.
///
/// NOT an entropy source: the stream is fully determined by the seed.
/// It exists so the collector, fallback and error paths can be driven
/// reproducibly, including injected open and read failures.
#[derive(Debug)]
pub struct SimulatedNoise {
    rng: ChaCha20Rng,
    seed: u64,
    status: SourceStatus,
    sequence: u64,
    /// Peak absolute sample value.
    amplitude: i16,
    fail_open: bool,
    /// Every n-th read fails.
    fail_every: Option<u64>,
}

impl SimulatedNoise {
    /// Creates a simulated device seeded with `seed`.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: ChaCha20Rng::seed_from_u64(seed),
            seed,
            status: SourceStatus::Unavailable,
            sequence: 0,
            amplitude: 512,
            fail_open: false,
            fail_every: None,
        }
    }

    /// Sets the peak absolute sample value.
    pub fn amplitude(mut self, amplitude: i16) -> Self {
        self.amplitude = amplitude.max(1);
        self
    }

    /// Makes `open` fail, as a missing device would.
    pub fn failing_open(mut self) -> Self {
        self.fail_open = true;
        self
    }

    /// Makes every `n`-th read fail.
    pub fn fail_every(mut self, n: u64) -> Self {
        self.fail_every = Some(n.max(1));
        self
    }

    fn next_sample(&mut self) -> i16 {
        let span = 2 * i32::from(self.amplitude) + 1;
        let offset = (self.rng.next_u32() % span as u32) as i32;
        (offset - i32::from(self.amplitude)) as i16
    }
}

impl Default for SimulatedNoise {
    fn default() -> Self {
        Self::with_seed(0)
    }
}

impl NoiseSource for SimulatedNoise {
    fn name(&self) -> &str {
        "simulated"
    }

    fn open(&mut self, config: &SourceConfig) -> Result<(), NoiseError> {
        if self.fail_open {
            return Err(NoiseError::DeviceNotFound("simulated device disabled".into()));
        }
        config
            .validate()
            .map_err(|e| NoiseError::OpenFailed(e.to_string()))?;

        self.rng = ChaCha20Rng::seed_from_u64(self.seed);
        self.sequence = 0;
        self.status = SourceStatus::Active;
        tracing::info!(seed = self.seed, "Simulated noise source opened");
        Ok(())
    }

    fn read(&mut self, n_samples: usize) -> Result<SampleBlock, NoiseError> {
        if !self.status.is_active() {
            return Err(NoiseError::NotOpen);
        }

        self.sequence += 1;
        if let Some(n) = self.fail_every {
            if self.sequence % n == 0 {
                return Err(NoiseError::ReadFailed(format!(
                    "injected failure on read {}",
                    self.sequence
                )));
            }
        }

        let samples = (0..n_samples).map(|_| self.next_sample()).collect();
        Ok(SampleBlock::new(samples, self.sequence))
    }

    fn status(&self) -> SourceStatus {
        self.status
    }

    fn close(&mut self) {
        if self.status.is_active() {
            self.status = SourceStatus::Stopped;
            tracing::info!("Simulated noise source closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_samples() {
        let config = SourceConfig::default();
        let mut a = SimulatedNoise::with_seed(42);
        let mut b = SimulatedNoise::with_seed(42);
        a.open(&config).unwrap();
        b.open(&config).unwrap();

        assert_eq!(a.read(64).unwrap().samples(), b.read(64).unwrap().samples());
    }

    #[test]
    fn test_samples_within_amplitude() {
        let mut source = SimulatedNoise::with_seed(1).amplitude(3);
        source.open(&SourceConfig::default()).unwrap();

        let block = source.read(1000).unwrap();
        assert!(block.samples().iter().all(|s| (-3..=3).contains(s)));
        assert!(block.samples().iter().any(|&s| s != block.samples()[0]));
    }

    #[test]
    fn test_injected_read_failures() {
        let mut source = SimulatedNoise::with_seed(1).fail_every(3);
        source.open(&SourceConfig::default()).unwrap();

        assert!(source.read(8).is_ok());
        assert!(source.read(8).is_ok());
        assert!(matches!(source.read(8), Err(NoiseError::ReadFailed(_))));
        assert!(source.read(8).is_ok());
    }

    #[test]
    fn test_failing_open_stays_unavailable() {
        let mut source = SimulatedNoise::with_seed(1).failing_open();
        assert!(source.open(&SourceConfig::default()).is_err());
        assert_eq!(source.status(), SourceStatus::Unavailable);
    }
}
