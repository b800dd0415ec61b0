//! Ambient Noise True Random Number Generator
//!
//! Harvests randomness from microphone ADC noise (with a fallback to the
//! operating system's secure entropy primitive), extracts features from
//! each sample block, and conditions them through a multi-stage hash
//! pipeline into 32-bit outputs.
//!
//! # Architecture
//!
//! ```text
//! source → extraction → collector → queue ┐
//!                                          ├→ conditioning → output
//!               (fresh sample per call) ───┘        ↓
//!                                            analysis (quality)
//! ```
//!
//! # Design Principles
//!
//! - **Never fails the caller**: device trouble degrades to system entropy
//! - **Bounded everything**: queue, history and shutdown are all bounded
//! - **Uses standard primitives**: SHA-256/SHA-512 conditioning, BLAKE3 seeding
//! - **No cryptographic claims**: quality metrics are diagnostics, not proofs
//!
//! # Example
//!
//! ```no_run
//! use noise_trng::{
//!     source::{SimulatedNoise, SourceConfig},
//!     TrueRandomGenerator,
//! };
//!
//! let generator = TrueRandomGenerator::builder()
//!     .source(Box::new(SimulatedNoise::with_seed(7)))
//!     .source_config(SourceConfig::default())
//!     .open()
//!     .unwrap();
//!
//! let values = generator.generate_sequence(16);
//! assert_eq!(values.len(), 16);
//!
//! println!("{:?}", generator.quality_metrics());
//! generator.close();
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod analysis;
pub mod collector;
pub mod conditioning;
pub mod config;
pub mod extraction;
pub mod generator;
pub mod metrics;
pub mod source;

mod sync;

// Re-export commonly used types at crate root
pub use analysis::{GeneratorStats, QualityMetrics, QualityMonitor, QualityReport};
pub use conditioning::{Conditioned, Conditioner, EntropyPool, POOL_SIZE};
pub use config::{FileConfig, GeneratorConfig};
pub use extraction::{EntropySample, FeatureExtractor, FeatureSet, NoiseExtractor};
pub use generator::{
    GeneratorBuilder, GeneratorError, GeneratorStatus, RandomSource, TrueRandomGenerator,
};
pub use source::{NoiseError, NoiseSource, SourceStatus};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
