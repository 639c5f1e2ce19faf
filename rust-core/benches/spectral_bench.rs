use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use spectral_fx::{SpectralFreeze, SpectralPitchShifter};
use std::f64::consts::PI;

const BLOCK: usize = 4096;

fn test_block() -> Vec<f64> {
    (0..BLOCK)
        .map(|i| {
            let t = i as f64 / 48000.0;
            0.5 * (2.0 * PI * 220.0 * t).sin() + 0.25 * (2.0 * PI * 1375.0 * t).sin()
        })
        .collect()
}

fn bench_freeze(c: &mut Criterion) {
    let input = test_block();
    let mut freeze = SpectralFreeze::new(48000.0).unwrap();
    freeze.prepare(BLOCK);
    freeze.freeze();

    let mut buf = input.clone();
    c.bench_function("freeze_4096", |b| {
        b.iter(|| {
            buf.copy_from_slice(&input);
            freeze.try_process_in_place(black_box(&mut buf)).unwrap();
        })
    });
}

fn bench_pitch_shift(c: &mut Criterion) {
    let input = test_block();
    let mut group = c.benchmark_group("pitch_shift_4096");

    for ratio in [0.5, 1.5, 2.0] {
        let mut shifter = SpectralPitchShifter::new(48000.0).unwrap();
        shifter.set_pitch_ratio(ratio).unwrap();
        shifter.prepare(BLOCK);

        let mut buf = input.clone();
        group.bench_with_input(BenchmarkId::from_parameter(ratio), &ratio, |b, _| {
            b.iter(|| {
                buf.copy_from_slice(&input);
                shifter.try_process_in_place(black_box(&mut buf)).unwrap();
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_freeze, bench_pitch_shift);
criterion_main!(benches);
