use noise_trng::conditioning::{xor_fold, Conditioner, EntropyPool, POOL_SIZE};
use noise_trng::extraction::{FeatureExtractor, NoiseExtractor};
use noise_trng::source::SampleBlock;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::hint::black_box;

pub fn bench_condition(c: &mut Criterion) {
    let conditioner = Conditioner::new();
    let pool = EntropyPool::from_bytes([0x5A; POOL_SIZE]);

    let mut group = c.benchmark_group("condition");
    for size in [76usize, 1024, 16 * 1024] {
        let material = vec![0xA5u8; size];
        group.bench_with_input(BenchmarkId::from_parameter(size), &material, |b, m| {
            b.iter(|| conditioner.condition(black_box(&pool), black_box(m)))
        });
    }
    group.finish();
}

pub fn bench_xor_fold(c: &mut Criterion) {
    c.bench_function("xor_fold 64 bytes", |b| {
        b.iter(|| xor_fold(black_box(&[0x3Cu8; 64])))
    });
}

pub fn bench_extract(c: &mut Criterion) {
    let samples: Vec<i16> = (0..512).map(|i| ((i * 7919) % 2048 - 1024) as i16).collect();
    let block = SampleBlock::new(samples, 1);
    let extractor = NoiseExtractor::default();

    c.bench_function("extract 512 samples", |b| {
        b.iter(|| extractor.extract(black_box(&block)))
    });
}

criterion_group!(benches, bench_condition, bench_xor_fold, bench_extract);
criterion_main!(benches);
