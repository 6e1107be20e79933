use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ulam_binned::*;

fn bench_naive_seed_100(c: &mut Criterion) {
    c.bench_function("naive U(1,2) 100 terms", |b| {
        b.iter(|| generate_seed(black_box(1), black_box(2), 100))
    });
}

fn bench_naive_resume_1000(c: &mut Criterion) {
    let seed = generate_seed(1, 2, 100).unwrap();

    c.bench_function("naive U(1,2) 100->1000 terms", |b| {
        b.iter(|| resume_generation(black_box(&seed), 1000))
    });
}

fn bench_binned_1000(c: &mut Criterion) {
    let seed = generate_seed(1, 2, 100).unwrap();
    let modulus = RationalModulus::new(22, 9).unwrap();

    c.bench_function("binned U(1,2) 100->1000 terms (22/9)", |b| {
        b.iter(|| {
            let mut ext = BinnedExtender::new(modulus, black_box(seed.terms())).unwrap();
            while ext.term_count() < 1000 {
                ext.test_next_term();
            }
            ext.last_tested()
        })
    });
}

fn bench_estimate_period(c: &mut Criterion) {
    let seed = generate_seed(1, 2, 100).unwrap();
    let config = PipelineConfig::default();

    c.bench_function("estimate_period U(1,2) 100 terms", |b| {
        b.iter(|| estimate_period(black_box(seed.terms()), &config))
    });
}

fn bench_initialize(c: &mut Criterion) {
    let pair = UlamPair::new(3, 4).unwrap();
    let config = PipelineConfig::default();

    c.bench_function("initialize U(3,4)", |b| {
        b.iter(|| initialize(black_box(pair), &config))
    });
}

criterion_group!(
    benches,
    bench_naive_seed_100,
    bench_naive_resume_1000,
    bench_binned_1000,
    bench_estimate_period,
    bench_initialize,
);
criterion_main!(benches);
