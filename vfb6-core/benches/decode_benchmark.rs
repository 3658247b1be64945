//! Benchmarks for VFB6 decoder performance.
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use rand::rngs::StdRng;
use rand::SeedableRng;
use vfb6_core::{DecoderConfig, TimeInterpolation, Vfb6Decoder};

/// Generates `n_frames` frames with headers, 8 hits, a clock word and a trailer.
fn synthetic_words(n_frames: u32) -> Vec<u32> {
    let mut words = Vec::new();
    for i in 0..n_frames {
        let mut halves: Vec<u16> = vec![0xC000 | (i & 0x1FFF) as u16, 0xE000 | (i & 0x1FFF) as u16];
        for h in 0..8u32 {
            let channel = ((i + h) % 97) as u16;
            let fine = ((i * 7 + h * 31) & 0xFF) as u16;
            halves.push((channel << 8) | fine);
        }
        halves.push(0x8000 | (i % 200) as u16);
        halves.push(0xA000 | (i & 0xFF) as u16);

        words.push(((i & 0xFFFF) << 16) | (halves.len() / 2) as u32);
        for pair in halves.chunks_exact(2) {
            words.push((u32::from(pair[1]) << 16) | u32::from(pair[0]));
        }
    }
    words
}

fn parse_benchmark(c: &mut Criterion) {
    let words = synthetic_words(100_000);

    let mut group = c.benchmark_group("parse_range");
    group.throughput(Throughput::Elements(words.len() as u64));

    group.bench_function("synthetic_100k_frames", |b| {
        b.iter(|| {
            let mut decoder = Vfb6Decoder::new();
            let events = decoder.parse_range(black_box(&words), 0, words.len());
            black_box(events.len())
        })
    });

    group.finish();
}

fn time_benchmark(c: &mut Criterion) {
    let words = synthetic_words(10_000);
    let mut decoder = Vfb6Decoder::with_uniform_source(
        DecoderConfig::default(),
        StdRng::seed_from_u64(0),
    );
    let events = decoder.parse_range(&words, 0, words.len());
    decoder.calibration_tables();
    let hits: Vec<_> = events.iter().flat_map(|e| e.hits.iter().copied()).collect();

    let mut group = c.benchmark_group("decode_time");
    group.throughput(Throughput::Elements(hits.len() as u64));

    for (name, interpolation) in [
        ("none", TimeInterpolation::None),
        ("linear", TimeInterpolation::Linear),
        ("random", TimeInterpolation::Random),
    ] {
        group.bench_function(name, |b| {
            b.iter(|| {
                let sum: f64 = hits
                    .iter()
                    .map(|&hit| decoder.time(black_box(hit), interpolation))
                    .sum();
                black_box(sum)
            })
        });
    }

    group.finish();
}

criterion_group!(benches, parse_benchmark, time_benchmark);
criterion_main!(benches);
