//! Von Neumann debiasing of the sample LSB stream.
//!
//! Removes first-order bias from a bit stream, not higher-order
//! correlation. Expected output length is half the input length times
//! the probability that a pair disagrees.

/// Least significant bit of every sample, one bit per byte.
pub fn lsb_stream(samples: &[i16]) -> Vec<u8> {
    samples.iter().map(|&s| (s & 0x01) as u8).collect()
}

/// Applies von Neumann debiasing to a stream of bits (one per byte).
///
/// Splits the input into disjoint adjacent pairs. A pair of differing
/// bits emits its first bit; an equal pair is discarded. A trailing
/// unpaired bit is ignored.
pub fn von_neumann(bits: &[u8]) -> Vec<u8> {
    bits.chunks_exact(2)
        .filter(|pair| pair[0] != pair[1])
        .map(|pair| pair[0])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_equal_pairs_discarded() {
        assert!(von_neumann(&[0, 0, 1, 1]).is_empty());
    }

    #[test]
    fn test_differing_pairs_emit_first_bit() {
        assert_eq!(von_neumann(&[0, 1, 0, 1]), vec![0, 0]);
        assert_eq!(von_neumann(&[1, 0, 0, 1]), vec![1, 0]);
    }

    #[test]
    fn test_trailing_bit_ignored() {
        assert_eq!(von_neumann(&[1, 0, 1]), vec![1]);
        assert!(von_neumann(&[1]).is_empty());
        assert!(von_neumann(&[]).is_empty());
    }

    #[test]
    fn test_lsb_of_negative_samples() {
        assert_eq!(lsb_stream(&[-1, -2, 3, 4, i16::MIN]), vec![1, 0, 1, 0, 0]);
    }

    proptest! {
        #[test]
        fn output_never_exceeds_half_input(bits in prop::collection::vec(0u8..=1, 0..512)) {
            let out = von_neumann(&bits);
            prop_assert!(out.len() <= bits.len() / 2);
            prop_assert!(out.iter().all(|&b| b <= 1));
        }
    }
}
