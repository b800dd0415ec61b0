//! Fixed-size entropy pool.
//!
//! The pool summarizes accumulated randomness between outputs. It is
//! replaced wholesale on every output and never grows, so its length is
//! part of the type.

use crate::source::{system_entropy, wall_clock_nanos};
use blake3::Hasher;

/// Pool length in bytes.
pub const POOL_SIZE: usize = 24;

/// Domain separator for initial seeding.
const SEED_DOMAIN: &[u8] = b"noise-trng-pool-seed-v1";

/// Domain separator for explicit refreshes.
const REFRESH_DOMAIN: &[u8] = b"noise-trng-pool-refresh-v1";

/// System entropy bytes gathered per seeding.
const SEED_SYSTEM_BYTES: usize = 32;

/// Raw seeding ingredients, concatenated in collection order.
#[derive(Clone)]
pub struct SeedMaterial {
    bytes: Vec<u8>,
}

impl SeedMaterial {
    /// Collects device sample (if any), system entropy, a nanosecond
    /// timestamp and the process id.
    pub fn gather(device_sample: Option<&[u8]>) -> Self {
        let mut bytes = Vec::with_capacity(
            device_sample.map_or(0, <[u8]>::len) + SEED_SYSTEM_BYTES + 12,
        );
        if let Some(sample) = device_sample {
            bytes.extend_from_slice(sample);
        }
        bytes.extend(system_entropy(SEED_SYSTEM_BYTES));
        bytes.extend_from_slice(&wall_clock_nanos().to_le_bytes());
        bytes.extend_from_slice(&std::process::id().to_le_bytes());

        tracing::debug!(
            bytes = bytes.len(),
            with_device = device_sample.is_some(),
            "Gathered seed material"
        );
        Self { bytes }
    }

    /// Wraps caller-provided ingredients.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl std::fmt::Debug for SeedMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeedMaterial")
            .field("bytes", &self.bytes.len())
            .finish_non_exhaustive()
    }
}

/// The generator's entropy pool.
#[derive(Clone, PartialEq, Eq)]
pub struct EntropyPool {
    bytes: [u8; POOL_SIZE],
}

impl EntropyPool {
    /// Creates a pool holding exactly `bytes`.
    pub fn from_bytes(bytes: [u8; POOL_SIZE]) -> Self {
        Self { bytes }
    }

    /// Derives a fresh pool from seed material.
    ///
    /// The ingredients are hashed down to the pool length with the
    /// BLAKE3 XOF rather than truncated, so every ingredient byte
    /// influences every pool byte.
    pub fn seeded(material: &SeedMaterial) -> Self {
        let mut hasher = Hasher::new();
        hasher.update(SEED_DOMAIN);
        hasher.update(material.as_bytes());
        Self::from_xof(&hasher)
    }

    /// Derives a replacement pool mixing the current pool with new
    /// seed material.
    ///
    /// Refreshing never discards what the current pool holds.
    pub fn refreshed(&self, material: &SeedMaterial) -> Self {
        let mut hasher = Hasher::new();
        hasher.update(REFRESH_DOMAIN);
        hasher.update(&self.bytes);
        hasher.update(material.as_bytes());
        Self::from_xof(&hasher)
    }

    fn from_xof(hasher: &Hasher) -> Self {
        let mut bytes = [0u8; POOL_SIZE];
        hasher.finalize_xof().fill(&mut bytes);
        Self { bytes }
    }

    /// Returns the pool bytes.
    #[inline]
    pub fn as_bytes(&self) -> &[u8; POOL_SIZE] {
        &self.bytes
    }

    /// Pool length in bytes; always [`POOL_SIZE`].
    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Always false; present for API symmetry with `len`.
    #[inline]
    pub fn is_empty(&self) -> bool {
        false
    }
}

impl std::fmt::Debug for EntropyPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntropyPool")
            .field("len", &POOL_SIZE)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_pool_length() {
        let pool = EntropyPool::seeded(&SeedMaterial::gather(None));
        assert_eq!(pool.len(), POOL_SIZE);
        assert_eq!(pool.as_bytes().len(), 24);
    }

    #[test]
    fn test_gather_includes_device_sample() {
        let without = SeedMaterial::gather(None);
        let with = SeedMaterial::gather(Some(&[7u8; 40]));

        assert_eq!(without.as_bytes().len(), 32 + 8 + 4);
        assert_eq!(with.as_bytes().len(), 40 + 32 + 8 + 4);
        assert_eq!(&with.as_bytes()[..40], &[7u8; 40]);
    }

    #[test]
    fn test_seeding_is_deterministic_in_material() {
        let material = SeedMaterial::from_bytes(vec![0x42; 64]);
        assert_eq!(EntropyPool::seeded(&material), EntropyPool::seeded(&material));
    }

    #[test]
    fn test_gathered_seeds_differ() {
        let a = EntropyPool::seeded(&SeedMaterial::gather(None));
        let b = EntropyPool::seeded(&SeedMaterial::gather(None));
        assert_ne!(a, b);
    }

    #[test]
    fn test_refresh_depends_on_current_pool() {
        let material = SeedMaterial::from_bytes(vec![0x01; 16]);
        let a = EntropyPool::from_bytes([0xAA; POOL_SIZE]).refreshed(&material);
        let b = EntropyPool::from_bytes([0xBB; POOL_SIZE]).refreshed(&material);

        assert_ne!(a, b);
        assert_eq!(a.len(), POOL_SIZE);
    }

    #[test]
    fn test_refresh_and_seed_are_domain_separated() {
        let material = SeedMaterial::from_bytes(Vec::new());
        let seeded = EntropyPool::seeded(&material);
        let refreshed = EntropyPool::from_bytes([0; POOL_SIZE]).refreshed(&material);
        assert_ne!(seeded, refreshed);
    }
}
