//! Second-order difference feature.
//!
//! Differencing twice cancels constant offsets and linear drift in the
//! signal, leaving the sample-to-sample curvature where noise dominates.

/// Low three bits of every second-order difference.
///
/// Produces `n - 2` bytes for `n > 2` samples, nothing otherwise.
pub fn second_difference_bits(samples: &[i16]) -> Vec<u8> {
    if samples.len() <= 2 {
        return Vec::new();
    }

    let first: Vec<i32> = samples
        .windows(2)
        .map(|w| i32::from(w[1]) - i32::from(w[0]))
        .collect();

    first
        .windows(2)
        // Truncation keeps two's-complement low bits for negatives.
        .map(|w| ((w[1] - w[0]) as u8) & 0x07)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_too_short() {
        assert!(second_difference_bits(&[]).is_empty());
        assert!(second_difference_bits(&[1, 2]).is_empty());
    }

    #[test]
    fn test_linear_ramp_is_zero() {
        let ramp: Vec<i16> = (0..50).map(|i| i * 7 - 100).collect();
        let out = second_difference_bits(&ramp);

        assert_eq!(out.len(), 48);
        assert!(out.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_known_values() {
        // first: [3, -1, 9]; second: [-4, 10]
        let out = second_difference_bits(&[0, 3, 2, 11]);
        assert_eq!(out, vec![(-4i32 as u8) & 0x07, 10 & 0x07]);
        assert_eq!(out, vec![4, 2]);
    }

    #[test]
    fn test_extreme_samples_do_not_overflow() {
        let out = second_difference_bits(&[i16::MIN, i16::MAX, i16::MIN]);
        assert_eq!(out.len(), 1);
    }
}
