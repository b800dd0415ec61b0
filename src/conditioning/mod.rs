//! Entropy conditioning via cryptographic hashing.
//!
//! This module folds the current pool and freshly gathered entropy into
//! one output value and a replacement pool, using SHA-256 and SHA-512
//! followed by an XOR fold. Pool seeding and refresh use BLAKE3.

mod fold;
mod pool;

pub use fold::{stage_one, stage_two, xor_fold, Conditioned, Conditioner, FOLDED_SIZE};
pub use pool::{EntropyPool, SeedMaterial, POOL_SIZE};
