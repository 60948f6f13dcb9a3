use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;

use kinact::prelude::data::{Assay, Dataset};
use kinact::prelude::fit::{fit, FitOptions};
use kinact::prelude::simulator::{simulate_endpoint, InhibitionParams};

fn example_dataset() -> Dataset {
    let assay = Assay::new(10.0, 1.0, 0.5, 5.0, 10.0, 100.0).unwrap();
    let truth = InhibitionParams::new(0.8, 2.5);
    let reference = simulate_endpoint(&InhibitionParams::default(), &assay, 3.0, 60.0, 0.0);
    let scale = 100.0 / reference;

    let mut builder = Dataset::builder(assay);
    for conc in [0.0, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 25.0] {
        let signal = simulate_endpoint(&truth, &assay, 3.0, 60.0, conc) * scale;
        builder = builder.observation(3.0, 60.0, conc, signal);
    }
    builder.build().unwrap()
}

fn simulate(n: usize) {
    let assay = Assay::new(10.0, 1.0, 0.5, 5.0, 10.0, 100.0).unwrap();
    let params = InhibitionParams::new(0.8, 2.5);
    for _ in 0..n {
        let product = simulate_endpoint(&params, &assay, 3.0, 60.0, 5.0);
        black_box(product);
    }
}

fn fit_dataset(dataset: &Dataset) {
    let result = fit(dataset, &FitOptions::default()).unwrap();
    black_box(result);
}

fn criterion_benchmark(c: &mut Criterion) {
    c.bench_function("simulate 100", |b| b.iter(|| simulate(black_box(100))));

    let dataset = example_dataset();
    c.bench_function("fit 8 rows", |b| b.iter(|| fit_dataset(black_box(&dataset))));
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
