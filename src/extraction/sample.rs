//! Extracted entropy sample type.

/// Where an entropy sample came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleOrigin {
    /// Feature extraction over a device read.
    Device,
    /// Direct system-entropy read.
    Fallback,
}

/// Bytes produced by one extraction pass.
///
/// This is the unit queued by the collector and the input to
/// conditioning. The bytes are debiased features, not uniform output.
#[derive(Clone)]
pub struct EntropySample {
    data: Vec<u8>,
    origin: SampleOrigin,
    /// Sequence number of the source block (0 for fallback reads).
    sequence: u64,
}

impl EntropySample {
    /// Creates a sample from extracted bytes.
    pub fn new(data: Vec<u8>, origin: SampleOrigin, sequence: u64) -> Self {
        Self {
            data,
            origin,
            sequence,
        }
    }

    /// Creates a sample from a system-entropy read.
    pub fn fallback(data: Vec<u8>) -> Self {
        Self::new(data, SampleOrigin::Fallback, 0)
    }

    /// Returns the sample bytes.
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Consumes the sample, returning its bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn origin(&self) -> SampleOrigin {
        self.origin
    }

    #[inline]
    pub fn sequence(&self) -> u64 {
        self.sequence
    }
}

impl std::fmt::Debug for EntropySample {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntropySample")
            .field("bytes", &self.data.len())
            .field("origin", &self.origin)
            .field("sequence", &self.sequence)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_sample() {
        let sample = EntropySample::fallback(vec![1, 2, 3]);
        assert_eq!(sample.origin(), SampleOrigin::Fallback);
        assert_eq!(sample.sequence(), 0);
        assert_eq!(sample.len(), 3);
        assert_eq!(sample.into_bytes(), vec![1, 2, 3]);
    }

    #[test]
    fn test_debug_hides_bytes() {
        let sample = EntropySample::new(vec![0xAB; 64], SampleOrigin::Device, 9);
        let text = format!("{:?}", sample);
        assert!(text.contains("bytes: 64"));
        assert!(!text.contains("171"));
    }
}
