//! Compression speed and ratio benchmarks across data patterns, input
//! sizes, and iteration counts.

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use shrinkler_core::{PackParams, compress};
use std::hint::black_box;

type PatternGenerator = fn(usize) -> Vec<u8>;

mod test_data {
    /// All bytes the same: the parser's skip heuristic should make this
    /// fast as well as tiny.
    pub fn uniform(size: usize) -> Vec<u8> {
        vec![0xAAu8; size]
    }

    /// No exploitable structure: a deterministic xorshift stream.
    pub fn random(size: usize) -> Vec<u8> {
        let mut data = Vec::with_capacity(size);
        let mut state: u32 = 0x1234_5678;
        for _ in 0..size {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            data.push((state & 0xff) as u8);
        }
        data
    }

    /// Short repeating pattern, exercising the repeated-offset shortcut.
    pub fn repetitive(size: usize) -> Vec<u8> {
        let pattern = b"TOBEORNOTTOBEORTOBEORNOT";
        let mut data = Vec::with_capacity(size);
        while data.len() < size {
            let remaining = size - data.len();
            let chunk = remaining.min(pattern.len());
            data.extend_from_slice(&pattern[..chunk]);
        }
        data
    }

    /// Natural-language-shaped text, the scenario this crate is tuned for.
    pub fn text_like(size: usize) -> Vec<u8> {
        let text = b"The quick brown fox jumps over the lazy dog. \
                     Pack my box with five dozen liquor jugs. \
                     How vexingly quick daft zebras jump! \
                     Lorem ipsum dolor sit amet, consectetur adipiscing elit. ";
        let mut data = Vec::with_capacity(size);
        while data.len() < size {
            let remaining = size - data.len();
            let chunk = remaining.min(text.len());
            data.extend_from_slice(&text[..chunk]);
        }
        data
    }

    /// Mixed sections, roughly approximating an executable's layout.
    pub fn binary_like(size: usize) -> Vec<u8> {
        let mut data = Vec::with_capacity(size);
        let mut state: u64 = 0x1234_5678_9abc_def0;
        let section = size / 4;

        for _ in 0..section {
            data.push((state % 256) as u8);
            if state % 10 < 3 {
                state = state.wrapping_add(1);
            }
        }
        for _ in 0..section {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
            data.push((state >> 32) as u8);
        }
        data.extend(std::iter::repeat_n(0u8, section));
        for _ in 0..(size - data.len()) {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
            data.push((state >> 32) as u8);
        }
        data
    }
}

mod data_sizes {
    pub const TINY: usize = 1024;
    pub const SMALL: usize = 8 * 1024;
    pub const MEDIUM: usize = 32 * 1024;
}

fn bench_compression_data_types(c: &mut Criterion) {
    let mut group = c.benchmark_group("compression_data_types");

    let patterns: [(&str, PatternGenerator); 5] = [
        ("uniform", test_data::uniform as PatternGenerator),
        ("random", test_data::random as PatternGenerator),
        ("repetitive", test_data::repetitive as PatternGenerator),
        ("text", test_data::text_like as PatternGenerator),
        ("binary", test_data::binary_like as PatternGenerator),
    ];

    let size = data_sizes::SMALL;
    let params = PackParams::default();

    for (name, generator) in patterns {
        let data = generator(size);
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(name), &data, |b, data| {
            b.iter(|| {
                let packed = compress(black_box(data), &params).unwrap();
                black_box(packed);
            });
        });
    }

    group.finish();
}

fn bench_compression_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("compression_sizes");

    let sizes = [
        ("1KB", data_sizes::TINY),
        ("8KB", data_sizes::SMALL),
        ("32KB", data_sizes::MEDIUM),
    ];
    let params = PackParams::default();

    for (name, size) in sizes {
        let data = test_data::text_like(size);
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(name), &data, |b, data| {
            b.iter(|| {
                let packed = compress(black_box(data), &params).unwrap();
                black_box(packed);
            });
        });
    }

    group.finish();
}

/// Each extra iteration re-runs the parser against a re-trained model; this
/// is the main knob a caller trades for ratio against wall-clock time.
fn bench_iteration_count(c: &mut Criterion) {
    let mut group = c.benchmark_group("iteration_count");
    group.sample_size(20);

    let data = test_data::text_like(data_sizes::SMALL);

    for iterations in [1u32, 2, 4] {
        let params = PackParams {
            iterations,
            ..PackParams::default()
        };
        group.bench_with_input(
            BenchmarkId::from_parameter(iterations),
            &data,
            |b, data| {
                b.iter(|| {
                    let packed = compress(black_box(data), &params).unwrap();
                    black_box(packed);
                });
            },
        );
    }

    group.finish();
}

fn bench_compression_ratio(c: &mut Criterion) {
    let mut group = c.benchmark_group("compression_ratio");
    group.sample_size(10);

    let patterns: [(&str, PatternGenerator); 5] = [
        ("uniform", test_data::uniform as PatternGenerator),
        ("random", test_data::random as PatternGenerator),
        ("repetitive", test_data::repetitive as PatternGenerator),
        ("text", test_data::text_like as PatternGenerator),
        ("binary", test_data::binary_like as PatternGenerator),
    ];

    let size = data_sizes::SMALL;
    let params = PackParams::default();

    for (name, generator) in patterns {
        let data = generator(size);
        group.bench_with_input(BenchmarkId::from_parameter(name), &data, |b, data| {
            b.iter(|| {
                let packed = compress(black_box(data), &params).unwrap();
                let ratio = data.len() as f64 / packed.len() as f64;
                black_box((packed, ratio));
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_compression_data_types,
    bench_compression_sizes,
    bench_iteration_count,
    bench_compression_ratio,
);
criterion_main!(benches);
