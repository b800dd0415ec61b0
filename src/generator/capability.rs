//! Capability contract shared by every generator kind.

/// `2^32`, the divisor that maps a `u32` into `[0, 1)`.
const U32_SPAN: f64 = 4_294_967_296.0;

/// Maps a 32-bit value into `[0, 1)`.
#[inline]
pub fn normalize(value: u32) -> f64 {
    f64::from(value) / U32_SPAN
}

/// The `next / generate_sequence / normalized_next` shape.
///
/// Comparison and analysis tooling treats true and deterministic
/// generators alike through this trait.
pub trait RandomSource {
    /// Next 32-bit value.
    fn next(&mut self) -> u32;

    /// `n` successive values.
    fn generate_sequence(&mut self, n: usize) -> Vec<u32> {
        (0..n).map(|_| self.next()).collect()
    }

    /// Next value mapped into `[0, 1)`.
    fn normalized_next(&mut self) -> f64 {
        normalize(self.next())
    }

    /// `n` successive values mapped into `[0, 1)`.
    fn normalized_sequence(&mut self, n: usize) -> Vec<f64> {
        (0..n).map(|_| self.normalized_next()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Counter(u32);

    impl RandomSource for Counter {
        fn next(&mut self) -> u32 {
            self.0 = self.0.wrapping_add(1);
            self.0
        }
    }

    #[test]
    fn test_normalize_bounds() {
        assert_eq!(normalize(0), 0.0);
        assert!(normalize(u32::MAX) < 1.0);
        assert_eq!(normalize(1 << 31), 0.5);
    }

    #[test]
    fn test_default_methods() {
        let mut counter = Counter(0);
        assert_eq!(counter.generate_sequence(3), vec![1, 2, 3]);

        let mut counter = Counter(u32::MAX - 1);
        let values = counter.normalized_sequence(2);
        assert!(values[0] < 1.0);
        assert_eq!(values[1], 0.0);
    }
}
