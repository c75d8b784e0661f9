//! Benchmarks for window computation and prefix-sum lookups.
//!
//! Run with: cargo bench -p vlist-core

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use vlist_core::{
    ExtentModel, FenwickTree, FixedGeometry, PrefixSumGeometry, Viewport, WindowDelta,
    compute_window,
};

// ============================================================================
// compute_window
// ============================================================================

fn bench_compute_window_fixed(c: &mut Criterion) {
    let mut group = c.benchmark_group("window/fixed");

    for count in [1_000usize, 100_000, 10_000_000] {
        let geometry = FixedGeometry::new(count, 200.0).expect("valid geometry");
        let mid = geometry.total_extent() / 2.0;

        group.bench_with_input(BenchmarkId::new("mid", count), &geometry, |b, g| {
            b.iter(|| compute_window(black_box(Viewport::new(mid, 600.0)), g, 2));
        });
    }

    group.finish();
}

fn bench_compute_window_prefix(c: &mut Criterion) {
    let mut group = c.benchmark_group("window/prefix_sum");

    for count in [1_000usize, 100_000, 1_000_000] {
        let extents: Vec<f64> = (0..count).map(|i| 20.0 + (i % 7) as f64 * 10.0).collect();
        let geometry = PrefixSumGeometry::from_extents(&extents).expect("valid geometry");
        let mid = geometry.total_extent() / 2.0;

        group.bench_with_input(BenchmarkId::new("mid", count), &geometry, |b, g| {
            b.iter(|| compute_window(black_box(Viewport::new(mid, 600.0)), g, 2));
        });
    }

    group.finish();
}

fn bench_scroll_sweep(c: &mut Criterion) {
    let geometry = FixedGeometry::new(100_000, 200.0).expect("valid geometry");

    c.bench_function("window/sweep_1000_samples", |b| {
        b.iter(|| {
            let mut prev = compute_window(Viewport::new(0.0, 600.0), &geometry, 2);
            let mut changed = 0usize;
            for step in 1..1_000 {
                let next =
                    compute_window(Viewport::new(f64::from(step) * 37.0, 600.0), &geometry, 2);
                if !WindowDelta::between(&prev, &next).is_empty() {
                    changed += 1;
                }
                prev = next;
            }
            black_box(changed)
        });
    });
}

// ============================================================================
// Fenwick
// ============================================================================

fn bench_fenwick(c: &mut Criterion) {
    let mut group = c.benchmark_group("fenwick");

    for n in [1_000usize, 100_000, 1_000_000] {
        let values: Vec<f64> = (0..n).map(|i| 1.0 + (i % 13) as f64).collect();

        group.bench_with_input(BenchmarkId::new("from_values", n), &values, |b, v| {
            b.iter(|| FenwickTree::from_values(black_box(v)));
        });

        let tree = FenwickTree::from_values(&values);
        let target = tree.total() * 0.61;
        group.bench_with_input(BenchmarkId::new("upper_bound", n), &tree, |b, t| {
            b.iter(|| t.upper_bound(black_box(target)));
        });
        group.bench_with_input(BenchmarkId::new("prefix_sum", n), &tree, |b, t| {
            b.iter(|| t.prefix_sum(black_box(n / 3)));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_compute_window_fixed,
    bench_compute_window_prefix,
    bench_scroll_sweep,
    bench_fenwick
);
criterion_main!(benches);
