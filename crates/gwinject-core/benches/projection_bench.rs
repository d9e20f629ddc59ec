//! Projection and SNR throughput
//!
//! Run with: cargo bench -p gwinject-core --bench projection_bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use gwinject_core::prelude::*;
use gwinject_core::psd::{welch, WelchConfig};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use std::sync::Arc;

const SAMPLE_RATE: f64 = 2048.0;
const DURATION: f64 = 8.0;

fn sources(n: usize, rng: &mut StdRng) -> ParameterSet {
    let mut column = |lo: f64, hi: f64| (0..n).map(|_| rng.gen_range(lo..hi)).collect::<Vec<_>>();
    ParameterSet::from_columns([
        ("mass_1", column(20.0, 40.0)),
        ("mass_2", column(10.0, 20.0)),
        ("luminosity_distance", column(200.0, 800.0)),
        ("theta_jn", column(0.0, 3.1)),
        ("phase", column(0.0, 6.28)),
        (RA, column(0.0, 6.28)),
        (DEC, column(-1.5, 1.5)),
        (PSI, column(0.0, 3.14)),
        (GEOCENT_TIME, column(1.24e9, 1.24e9 + 4096.0)),
    ])
    .expect("equal column lengths")
}

fn background_psd(rng: &mut StdRng) -> Psd {
    let normal = Normal::new(0.0, 1e-21).expect("valid sigma");
    let data: Vec<f64> = (0..(SAMPLE_RATE * 64.0) as usize)
        .map(|_| normal.sample(rng))
        .collect();
    welch(&data, &WelchConfig::new(SAMPLE_RATE, 2.0)).expect("enough data")
}

fn bench_generation(c: &mut Criterion) {
    let mut group = c.benchmark_group("signal_batch_generation");
    let model = Arc::new(gwinject_core::waveform::NewtonianChirp::new(
        SAMPLE_RATE,
        DURATION,
        20.0,
        50.0,
    ));
    let generator = SignalBatchGenerator::new(model).expect("valid high-pass");
    let mut rng = StdRng::seed_from_u64(1);

    for n in [8usize, 64] {
        let params = sources(n, &mut rng);
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::new("generate", n), &params, |b, p| {
            b.iter(|| generator.generate(black_box(p)))
        });
    }
    group.finish();
}

fn bench_projection(c: &mut Criterion) {
    let mut group = c.benchmark_group("detector_projection");
    let model = Arc::new(gwinject_core::waveform::NewtonianChirp::new(
        SAMPLE_RATE,
        DURATION,
        20.0,
        50.0,
    ));
    let generator = SignalBatchGenerator::new(model.clone()).expect("valid high-pass");
    let projector = DetectorProjector::from_model(model.as_ref());
    let mut rng = StdRng::seed_from_u64(2);
    let psd = background_psd(&mut rng);

    for n in [8usize, 64] {
        let params = sources(n, &mut rng);
        let raw = generator.generate(&params).expect("valid parameters");
        group.throughput(Throughput::Elements(n as u64));

        group.bench_with_input(BenchmarkId::new("project", n), &raw, |b, raw| {
            b.iter(|| projector.project(black_box(raw), &params, "H1", None, false))
        });
        group.bench_with_input(BenchmarkId::new("project_with_snr", n), &raw, |b, raw| {
            b.iter(|| projector.project(black_box(raw), &params, "H1", Some(&psd), true))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_generation, bench_projection);
criterion_main!(benches);
