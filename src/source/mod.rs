//! Noise sources and the system entropy fallback.
//!
//! A noise source is treated as a supplier of raw samples, not as a
//! source of entropy directly: every block still goes through feature
//! extraction and conditioning. Any failure here degrades to system
//! entropy and is never fatal to the generator.

mod microphone;
mod noise;
mod simulated;
mod system;

pub use crate::config::{SourceBackend, SourceConfig};
pub use microphone::MicrophoneSource;
pub use noise::{NoiseError, NoiseSource, SampleBlock, SourceStatus};
pub use simulated::SimulatedNoise;
pub use system::{system_entropy, wall_clock_nanos, SystemNoise};

use std::sync::{Arc, Mutex};

/// A noise source shared between the collector worker and the generator.
pub type SharedSource = Arc<Mutex<Box<dyn NoiseSource>>>;

/// Builds the noise source selected by `config`.
///
/// Returns `None` for [`SourceBackend::Fallback`].
pub fn from_config(config: &SourceConfig) -> Option<Box<dyn NoiseSource>> {
    match config.backend {
        SourceBackend::Fallback => None,
        SourceBackend::System => Some(Box::new(SystemNoise::new())),
        SourceBackend::Simulated => Some(Box::new(SimulatedNoise::with_seed(config.simulated_seed))),
        SourceBackend::Microphone => Some(Box::new(MicrophoneSource::new())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_selection() {
        assert!(from_config(&SourceConfig::for_backend(SourceBackend::Fallback)).is_none());

        let system = from_config(&SourceConfig::for_backend(SourceBackend::System)).unwrap();
        assert_eq!(system.name(), "system");

        let simulated = from_config(&SourceConfig::for_backend(SourceBackend::Simulated)).unwrap();
        assert_eq!(simulated.name(), "simulated");
        assert_eq!(simulated.status(), SourceStatus::Unavailable);
    }
}
