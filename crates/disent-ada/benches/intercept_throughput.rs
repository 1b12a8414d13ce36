use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use disent_ada::{sample_pairs, AdaInterceptor, AverageMode, PairSamplerConfig, ThresholdMode};
use disent_core::RngHandle;

fn bench_intercept(c: &mut Criterion) {
    let config = PairSamplerConfig {
        factor_sizes: vec![3, 6, 40, 32, 32, 10, 10, 10, 15, 4],
        ..PairSamplerConfig::default()
    };
    let mut rng = RngHandle::from_seed(2718);
    let pairs = sample_pairs(&config, 256, &mut rng).expect("pairs");

    let mut group = c.benchmark_group("intercept");
    for average_mode in AverageMode::ALL {
        let interceptor = AdaInterceptor::new(average_mode, ThresholdMode::Kl);
        group.bench_with_input(
            BenchmarkId::from_parameter(average_mode),
            &interceptor,
            |b, interceptor| {
                b.iter(|| {
                    interceptor
                        .intercept(pairs.first.clone(), pairs.second.clone())
                        .expect("intercept")
                })
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_intercept);
criterion_main!(benches);
