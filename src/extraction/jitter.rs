//! Timing-jitter features.
//!
//! The elapsed time of tiny operations varies with cache state, interrupts
//! and frequency scaling. Only the low byte of each measurement is kept;
//! the high bits are predictable.

use std::hint::black_box;
use std::time::Instant;

/// Maximum number of timed sub-samples per block.
pub const JITTER_SUBSAMPLES: usize = 10;

/// Times a trivial arithmetic operation on up to `max` samples.
pub fn arithmetic_jitter(samples: &[i16], max: usize) -> Vec<u8> {
    samples
        .iter()
        .take(max)
        .map(|&s| {
            let start = Instant::now();
            black_box(i32::from(black_box(s)) * 2);
            low_byte(start)
        })
        .collect()
}

/// Times `rounds` process-id lookups.
pub fn syscall_jitter(rounds: usize) -> Vec<u8> {
    (0..rounds)
        .map(|_| {
            let start = Instant::now();
            black_box(std::process::id());
            low_byte(start)
        })
        .collect()
}

/// Duration of a 1 KiB zeroed allocation in nanoseconds, little-endian.
pub fn allocation_timing() -> [u8; 8] {
    let start = Instant::now();
    let buffer = black_box(vec![0u8; 1024]);
    let elapsed = start.elapsed().as_nanos() as u64;
    drop(buffer);
    elapsed.to_le_bytes()
}

#[inline]
fn low_byte(start: Instant) -> u8 {
    (start.elapsed().as_nanos() & 0xFF) as u8
}
