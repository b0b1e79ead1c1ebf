use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use nuts_slice::{LogpFn, NutsSampler, NutsSettings, RngKey};

fn make_sampler(
    dim: usize,
    mu: f64,
    num_tune: u64,
) -> NutsSampler<LogpFn<impl FnMut(&[f64], &mut [f64]) -> f64>> {
    let func = LogpFn::new(dim, move |x: &[f64], grad: &mut [f64]| {
        let mut logp = 0f64;
        for (x, grad) in x.iter().zip(grad.iter_mut()) {
            let diff = x - mu;
            logp -= diff * diff / 2.;
            *grad = -diff;
        }
        logp
    });
    let settings = NutsSettings {
        num_tune,
        initial_step_size: Some(0.5),
        ..Default::default()
    };
    NutsSampler::new(func, &vec![3.5; dim], settings).unwrap()
}

fn criterion_benchmark(c: &mut Criterion) {
    c.bench_function("make sampler 10", |b| {
        b.iter(|| make_sampler(black_box(10), black_box(3.), 1))
    });

    let mut sampler = make_sampler(10, 3., 100);
    let sum: f64 = {
        let trace = sampler.sample(100, RngKey::new(42)).unwrap();
        (0..100).map(|i| trace.samples[(i, 0)]).sum()
    };

    c.bench_function("sample normal 10", |b| {
        b.iter_batched(
            || RngKey::new(42),
            |key| {
                let trace = sampler.sample(100, key).unwrap();
                let total: f64 = (0..100).map(|i| trace.samples[(i, 0)]).sum();
                assert_eq!(total, sum);
            },
            BatchSize::SmallInput,
        )
    });

    let mut sampler = make_sampler(1000, 3., 100);
    c.bench_function("sample normal 1000", |b| {
        b.iter_batched(
            || RngKey::new(42),
            |key| sampler.sample(black_box(10), key).unwrap(),
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
