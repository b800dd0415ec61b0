//! Generator facade and lifecycle.
//!
//! [`TrueRandomGenerator`] ties the noise source, background collector,
//! conditioner and quality monitor together behind a `&self` API that
//! never fails once construction succeeded.

mod capability;
mod lifecycle;
mod trng;

pub use capability::{normalize, RandomSource};
pub use lifecycle::GeneratorStatus;
pub use trng::{GeneratorBuilder, TrueRandomGenerator};

use crate::config::ConfigError;
use thiserror::Error;

/// Errors returned while constructing a generator.
#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
}
