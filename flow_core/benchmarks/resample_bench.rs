use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use flow_core::{FieldRecord, FrameAverager, GridDescriptor, GridInfo, Resampler};

fn flow_map(size: usize, seed: f64) -> FieldRecord {
    let descriptor = GridDescriptor::new([0.0, 0.0], [0.25, 0.25], [size, size]);
    let (xs, ys) = descriptor.coordinates();
    let mass: Vec<f64> = xs
        .iter()
        .zip(&ys)
        .map(|(x, y)| (x * seed).sin().abs() + y)
        .collect();
    let number = mass.iter().map(|m| m.floor()).collect();
    let u = xs.iter().map(|x| (x + seed).cos()).collect();
    let v = ys.iter().map(|y| (y - seed).sin()).collect();
    let t = mass.iter().map(|m| 290.0 + m).collect();
    FieldRecord::new(
        [
            ("X", xs),
            ("Y", ys),
            ("M", mass),
            ("N", number),
            ("T", t),
            ("U", u),
            ("V", v),
        ],
        Some(GridInfo::structured(&descriptor)),
    )
    .expect("bench flow map")
}

fn bench_resample(c: &mut Criterion) {
    let resampler = Resampler::flow_maps();
    let mut group = c.benchmark_group("resample");

    for size in [16usize, 32, 64, 128] {
        let record = flow_map(size, 1.0);
        group.bench_with_input(BenchmarkId::new("downsample", size), &record, |b, record| {
            b.iter(|| {
                resampler
                    .downsample(record, [2, 2], (None, None), (None, None))
                    .expect("downsample")
            })
        });
        group.bench_with_input(BenchmarkId::new("supersample", size), &record, |b, record| {
            b.iter(|| resampler.supersample(record, Some(2)).expect("supersample"))
        });
    }

    group.finish();
}

fn bench_average(c: &mut Criterion) {
    let averager = FrameAverager::flow_maps();
    let mut group = c.benchmark_group("average");

    for frames in [2usize, 8, 32] {
        group.bench_with_input(BenchmarkId::new("frames", frames), &frames, |b, &frames| {
            b.iter_batched(
                || (0..frames).map(|i| flow_map(64, i as f64)).collect::<Vec<_>>(),
                |records| averager.average(&records).expect("average"),
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

criterion_group!(resample_benches, bench_resample, bench_average);
criterion_main!(resample_benches);
