//! Noise source abstraction.
//!
//! A trait over anything that produces blocks of signed 16-bit samples,
//! so real capture hardware and test doubles are interchangeable.

use crate::config::SourceConfig;
use std::fmt;
use thiserror::Error;

/// Errors that can occur during noise source operations.
#[derive(Debug, Error)]
pub enum NoiseError {
    #[error("noise device not found: {0}")]
    DeviceNotFound(String),
    #[error("failed to open noise device: {0}")]
    OpenFailed(String),
    #[error("failed to read samples: {0}")]
    ReadFailed(String),
    #[error("noise device not open")]
    NotOpen,
}

/// Lifecycle state of a noise source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceStatus {
    /// Never opened, or opening failed.
    #[default]
    Unavailable,
    /// Open and delivering samples.
    Active,
    /// Closed, or the device went away.
    Stopped,
}

impl SourceStatus {
    /// Returns true if reads are expected to succeed.
    #[inline]
    pub fn is_active(self) -> bool {
        self == SourceStatus::Active
    }
}

impl fmt::Display for SourceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            SourceStatus::Unavailable => "unavailable",
            SourceStatus::Active => "active",
            SourceStatus::Stopped => "stopped",
        };
        f.write_str(text)
    }
}

/// Trait for noise source implementations.
///
/// Implementations must bound the time a single `read` can block;
/// the generator relies on that when it reads synchronously.
pub trait NoiseSource: Send {
    /// Short backend name for logs and status output.
    fn name(&self) -> &str;

    /// Opens the device at the configured sample rate and buffer size.
    fn open(&mut self, config: &SourceConfig) -> Result<(), NoiseError>;

    /// Reads `n_samples` samples.
    fn read(&mut self, n_samples: usize) -> Result<SampleBlock, NoiseError>;

    /// Current lifecycle state.
    fn status(&self) -> SourceStatus;

    /// Releases the device. Calling this more than once is a no-op.
    fn close(&mut self);
}

/// One block of raw samples read from a noise source.
#[derive(Clone)]
pub struct SampleBlock {
    samples: Vec<i16>,
    sequence: u64,
}

impl SampleBlock {
    /// Creates a block from raw samples.
    pub fn new(samples: Vec<i16>, sequence: u64) -> Self {
        Self { samples, sequence }
    }

    /// Decodes little-endian signed 16-bit PCM.
    ///
    /// A trailing odd byte is ignored.
    pub fn from_le_bytes(bytes: &[u8], sequence: u64) -> Self {
        let samples = bytes
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        Self::new(samples, sequence)
    }

    /// Returns the samples.
    #[inline]
    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    /// Returns the number of samples.
    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Returns true if the block holds no samples.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Returns the read sequence number.
    #[inline]
    pub fn sequence(&self) -> u64 {
        self.sequence
    }
}

impl fmt::Debug for SampleBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SampleBlock")
            .field("samples", &self.samples.len())
            .field("sequence", &self.sequence)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_from_le_bytes() {
        let block = SampleBlock::from_le_bytes(&[0x01, 0x00, 0xFF, 0xFF, 0x00, 0x80], 3);

        assert_eq!(block.samples(), &[1, -1, i16::MIN]);
        assert_eq!(block.sequence(), 3);
    }

    #[test]
    fn test_block_ignores_trailing_byte() {
        let block = SampleBlock::from_le_bytes(&[0x02, 0x00, 0x07], 1);
        assert_eq!(block.len(), 1);
    }

    #[test]
    fn test_status_display() {
        assert_eq!(SourceStatus::Active.to_string(), "active");
        assert!(!SourceStatus::Stopped.is_active());
        assert_eq!(SourceStatus::default(), SourceStatus::Unavailable);
    }
}
