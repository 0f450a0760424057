//! Rank test benchmarks
//!
//! Covers the two p-value paths of the rank-sum test (exact distribution for
//! small tie-free samples, normal approximation otherwise) and the
//! Kruskal-Wallis test at the sizes of the experiment's cells.
//!
//! ```bash
//! cargo bench --bench rank_tests
//! ```

use bdg_replication::hypothesis::{benjamini_hochberg, kruskal_wallis, rank_sum_test};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

/// Deterministic give amounts in 0..=60
fn gives(n: usize, offset: usize) -> Vec<f64> {
    (0..n).map(|i| ((i * 37 + offset * 11) % 61) as f64).collect()
}

/// Distinct values so the exact path is taken
fn distinct(n: usize, offset: f64) -> Vec<f64> {
    (0..n).map(|i| i as f64 * 1.5 + offset).collect()
}

fn bench_rank_sum(c: &mut Criterion) {
    let mut group = c.benchmark_group("rank_sum_test");

    for n in [10, 30, 45] {
        let a = distinct(n, 0.25);
        let b = distinct(n, 0.5);
        group.bench_with_input(BenchmarkId::new("exact", n), &n, |bench, _| {
            bench.iter(|| rank_sum_test(black_box(&a), black_box(&b), 50))
        });
    }

    for n in [50, 200, 1000] {
        let a = gives(n, 1);
        let b = gives(n, 2);
        group.bench_with_input(BenchmarkId::new("normal", n), &n, |bench, _| {
            bench.iter(|| rank_sum_test(black_box(&a), black_box(&b), 50))
        });
    }

    group.finish();
}

fn bench_kruskal(c: &mut Criterion) {
    let mut group = c.benchmark_group("kruskal_wallis");

    for n in [50, 200, 1000] {
        let groups = vec![gives(n, 1), gives(n, 2), gives(n, 3)];
        group.bench_with_input(BenchmarkId::new("three_groups", n), &n, |bench, _| {
            bench.iter(|| kruskal_wallis(black_box(&groups)))
        });
    }

    group.finish();
}

fn bench_bh(c: &mut Criterion) {
    let pvalues = [0.7654, 0.4206, 0.2735, 0.7723, 0.0136, 0.0078, 0.2025, 0.1997, 0.0095];
    c.bench_function("benjamini_hochberg_nine", |bench| {
        bench.iter(|| benjamini_hochberg(black_box(&pvalues)))
    });
}

criterion_group!(benches, bench_rank_sum, bench_kruskal, bench_bh);
criterion_main!(benches);
