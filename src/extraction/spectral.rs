//! High-frequency spectral feature.
//!
//! A heuristic booster, not a proven entropy source: ambient recordings
//! carry most of their predictable energy at low frequencies, so only the
//! upper half of the spectrum is kept.

use rustfft::{num_complex::Complex, FftPlanner};

/// Blocks shorter than this produce no spectral bytes.
pub const MIN_SPECTRAL_SAMPLES: usize = 64;

/// Low nibble of every magnitude in the upper half of the spectrum.
///
/// Takes the FFT of the whole block, keeps bins `[n/2, n)`, truncates
/// each magnitude to an integer and emits its low four bits.
pub fn high_band_nibbles(samples: &[i16]) -> Vec<u8> {
    let n = samples.len();
    if n < MIN_SPECTRAL_SAMPLES {
        return Vec::new();
    }

    let mut buffer: Vec<Complex<f64>> = samples
        .iter()
        .map(|&s| Complex::new(f64::from(s), 0.0))
        .collect();

    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(n);
    fft.process(&mut buffer);

    buffer[n / 2..]
        .iter()
        .map(|bin| (bin.norm() as u64 & 0x0F) as u8)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_block_yields_nothing() {
        assert!(high_band_nibbles(&[1i16; MIN_SPECTRAL_SAMPLES - 1]).is_empty());
    }

    #[test]
    fn test_upper_half_length() {
        let samples: Vec<i16> = (0..128).map(|i| ((i * 37) % 101) as i16 - 50).collect();
        let out = high_band_nibbles(&samples);

        assert_eq!(out.len(), 64);
        assert!(out.iter().all(|&b| b <= 0x0F));
    }

    #[test]
    fn test_constant_signal_has_no_high_band() {
        // All energy sits in the DC bin, which is outside the upper half.
        let out = high_band_nibbles(&[100i16; 64]);
        assert!(out.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_nyquist_tone_lands_in_first_kept_bin() {
        let samples: Vec<i16> = (0..64).map(|i| if i % 2 == 0 { 1 } else { -1 }).collect();
        let out = high_band_nibbles(&samples);

        // Only X[32] carries energy; every other kept bin is ~0.
        assert_eq!(out.len(), 32);
        assert!(out[1..].iter().all(|&b| b == 0));
    }
}
