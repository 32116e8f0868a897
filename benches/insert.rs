use birch_cftree::{Branching, CfTreeParams};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn random_like_point(dim: usize, seed: usize) -> Vec<f64> {
    (0..dim)
        .map(|i| {
            let x = ((seed * 2_654_435_761 + i * 40_503) % 10_000) as f64;
            x / 100.0
        })
        .collect()
}

fn insert_throughput(c: &mut Criterion) {
    let dim = 8;

    c.bench_function("insert 10k points, fixed branching", |b| {
        b.iter(|| {
            let mut tree = CfTreeParams::new(dim)
                .with_branching(Branching::Fixed(32))
                .with_threshold(5.0)
                .with_leaf_budget(2_000)
                .build::<f64>()
                .unwrap();
            for i in 0..10_000 {
                let point = random_like_point(dim, i);
                tree.insert(black_box(&point)).unwrap();
            }
            black_box(tree.leaf_entry_count());
        });
    });

    c.bench_function("insert 10k points, page-derived branching", |b| {
        b.iter(|| {
            let mut tree = CfTreeParams::new(dim).with_threshold(5.0).with_leaf_budget(2_000).build::<f64>().unwrap();
            for i in 0..10_000 {
                let point = random_like_point(dim, i);
                tree.insert(black_box(&point)).unwrap();
            }
            black_box(tree.leaf_entry_count());
        });
    });
}

criterion_group!(benches, insert_throughput);
criterion_main!(benches);
