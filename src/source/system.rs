//! System entropy primitive and OS-provided ingredients.
//!
//! The operating system CSPRNG is always assumed available. It backs the
//! fallback path when no device is open, seeds every pool, and drives the
//! [`SystemNoise`] stand-in device.

use super::noise::{NoiseError, NoiseSource, SampleBlock, SourceStatus};
use crate::config::SourceConfig;
use rand_core::{OsRng, RngCore};

/// Reads `len` bytes from the operating system's secure entropy source.
pub fn system_entropy(len: usize) -> Vec<u8> {
    let mut buf = vec![0u8; len];
    OsRng.fill_bytes(&mut buf);
    buf
}

/// Wall-clock time in nanoseconds since the Unix epoch.
///
/// Used only as a whitening ingredient, never for ordering.
pub fn wall_clock_nanos() -> u64 {
    chrono::Utc::now()
        .timestamp_nanos_opt()
        .map_or(0, |nanos| nanos as u64)
}

/// Noise source whose samples come straight from system entropy.
///
/// Behaves like a device (open/read/close, status transitions) so the
/// whole pipeline, including the background collector, runs without
/// capture hardware.
#[derive(Debug, Default)]
pub struct SystemNoise {
    status: SourceStatus,
    sequence: u64,
}

impl SystemNoise {
    pub fn new() -> Self {
        Self::default()
    }
}

impl NoiseSource for SystemNoise {
    fn name(&self) -> &str {
        "system"
    }

    fn open(&mut self, config: &SourceConfig) -> Result<(), NoiseError> {
        config
            .validate()
            .map_err(|e| NoiseError::OpenFailed(e.to_string()))?;
        self.status = SourceStatus::Active;
        self.sequence = 0;
        tracing::info!(sample_rate = config.sample_rate, "System noise source opened");
        Ok(())
    }

    fn read(&mut self, n_samples: usize) -> Result<SampleBlock, NoiseError> {
        if !self.status.is_active() {
            return Err(NoiseError::NotOpen);
        }
        self.sequence += 1;
        Ok(SampleBlock::from_le_bytes(
            &system_entropy(n_samples * 2),
            self.sequence,
        ))
    }

    fn status(&self) -> SourceStatus {
        self.status
    }

    fn close(&mut self) {
        if self.status.is_active() {
            self.status = SourceStatus::Stopped;
            tracing::info!("System noise source closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_entropy_length() {
        assert_eq!(system_entropy(0).len(), 0);
        assert_eq!(system_entropy(32).len(), 32);
    }

    #[test]
    fn test_system_entropy_varies() {
        assert_ne!(system_entropy(32), system_entropy(32));
    }

    #[test]
    fn test_wall_clock_is_after_2020() {
        // 2020-01-01T00:00:00Z in nanoseconds
        assert!(wall_clock_nanos() > 1_577_836_800_000_000_000);
    }

    #[test]
    fn test_system_noise_lifecycle() {
        let mut source = SystemNoise::new();
        assert_eq!(source.status(), SourceStatus::Unavailable);
        assert!(matches!(source.read(8), Err(NoiseError::NotOpen)));

        source.open(&SourceConfig::default()).unwrap();
        assert_eq!(source.status(), SourceStatus::Active);

        let block = source.read(256).unwrap();
        assert_eq!(block.len(), 256);
        assert_eq!(block.sequence(), 1);

        source.close();
        assert_eq!(source.status(), SourceStatus::Stopped);
        source.close();
        assert_eq!(source.status(), SourceStatus::Stopped);
    }
}
